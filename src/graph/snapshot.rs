//! Repertoire snapshot identity.
//!
//! A `RepertoireSnapshot` fingerprints the whole graph so that downstream
//! artifacts (frequency reports, chunk exports) can name the exact graph
//! state they were computed from.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{Position, Side};
use crate::REPERTOIRE_SCHEMA_VERSION;

use super::Repertoire;

/// A deterministic fingerprint of a repertoire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepertoireSnapshot {
    /// xxh64 over every other field.
    pub snapshot_id: String,
    /// Owning side.
    pub side: Side,
    /// Root identity.
    pub root: Position,
    /// Nodes, root included.
    pub node_count: u64,
    /// Edges.
    pub edge_count: u64,
    /// Non-empty lines ingested.
    pub line_count: u64,
    /// Schema version used for types.
    pub schema_version: String,
    /// Hash of the sorted `(parent, notation, child, count)` list.
    pub structure_hash: String,
}

#[derive(Serialize)]
struct SnapshotIdInput<'a> {
    side: Side,
    root: &'a Position,
    node_count: u64,
    edge_count: u64,
    line_count: u64,
    schema_version: &'a str,
    structure_hash: &'a str,
}

impl RepertoireSnapshot {
    /// Compute the snapshot of `repertoire`.
    pub fn compute(repertoire: &Repertoire) -> Self {
        let structure_hash = canonical_hash_hex(&repertoire.structure());
        let root = repertoire.root_node().position().clone();
        let node_count = repertoire.num_nodes() as u64;
        let edge_count = repertoire.num_edges() as u64;
        let line_count = repertoire.lines_ingested();

        let snapshot_id = canonical_hash_hex(&SnapshotIdInput {
            side: repertoire.side(),
            root: &root,
            node_count,
            edge_count,
            line_count,
            schema_version: REPERTOIRE_SCHEMA_VERSION,
            structure_hash: &structure_hash,
        });

        Self {
            snapshot_id,
            side: repertoire.side(),
            root,
            node_count,
            edge_count,
            line_count,
            schema_version: REPERTOIRE_SCHEMA_VERSION.to_string(),
            structure_hash,
        }
    }

    /// Whether `repertoire` still matches this snapshot.
    pub fn verify(&self, repertoire: &Repertoire) -> bool {
        Self::compute(repertoire).snapshot_id == self.snapshot_id
    }
}

impl Repertoire {
    /// Fingerprint the current graph state.
    pub fn snapshot(&self) -> RepertoireSnapshot {
        RepertoireSnapshot::compute(self)
    }
}
