//! Move-frequency aggregation.
//!
//! Read-only pass over a [`Repertoire`]: for every player node, rank its
//! outgoing moves by the edge counters accumulated during ingestion. Shared
//! nodes carry one counter set, so transposing lines pool into a single
//! distribution.
//!
//! ## Ordering
//!
//! Count descending, then notation ascending. Positions are keyed in a
//! `BTreeMap`, so the whole table is independent of ingestion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::graph::Repertoire;
use crate::types::{Edge, MoveFingerprint, Position, Side};

/// One ranked move at a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCount {
    /// SAN notation.
    pub notation: String,
    /// Coordinate notation.
    pub uci: String,
    /// Lines that took the move.
    pub count: u64,
}

/// Ranked moves per player node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    /// Side whose decision points are ranked.
    pub side: Side,
    /// Ranked moves keyed by position identity.
    pub entries: BTreeMap<Position, Vec<MoveCount>>,
}

impl FrequencyTable {
    /// Ranked moves at `position`.
    pub fn get(&self, position: &Position) -> Option<&[MoveCount]> {
        self.entries.get(position).map(Vec::as_slice)
    }

    /// Highest-ranked move at `position`.
    pub fn top(&self, position: &Position) -> Option<&MoveCount> {
        self.get(position).and_then(|moves| moves.first())
    }

    /// Number of ranked decision points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no decision points.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Edges of one node in rank order.
pub(crate) fn ranked_edges<'a, I>(edges: I) -> Vec<&'a Edge>
where
    I: IntoIterator<Item = &'a Edge>,
{
    let mut ranked: Vec<&Edge> = edges.into_iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.notation.cmp(&b.notation)));
    ranked
}

/// Rank outgoing moves at every player node that has at least one.
///
/// An empty repertoire yields an empty table.
pub fn frequencies(repertoire: &Repertoire) -> FrequencyTable {
    let side = repertoire.side();
    if repertoire.is_empty() {
        warn!(%side, "frequencies requested on empty repertoire");
        return FrequencyTable {
            side,
            entries: BTreeMap::new(),
        };
    }

    let entries: BTreeMap<Position, Vec<MoveCount>> = repertoire
        .nodes()
        .filter(|node| repertoire.is_player_node(node) && !node.is_leaf())
        .map(|node| {
            let ranked = ranked_edges(node.children())
                .into_iter()
                .map(|edge| MoveCount {
                    notation: edge.notation.clone(),
                    uci: edge.uci.clone(),
                    count: edge.count,
                })
                .collect();
            (node.position().clone(), ranked)
        })
        .collect();

    info!(%side, decision_points = entries.len(), "frequencies computed");
    FrequencyTable { side, entries }
}

/// How many player nodes play each piece/from/to move.
///
/// The same physical move (say `Ng1f3`) played from different positions is
/// tallied together.
pub fn fingerprint_frequencies(repertoire: &Repertoire) -> BTreeMap<MoveFingerprint, u64> {
    let mut tally: BTreeMap<MoveFingerprint, u64> = BTreeMap::new();
    for node in repertoire.nodes().filter(|node| repertoire.is_player_node(node)) {
        for edge in node.children() {
            *tally.entry(edge.fingerprint.clone()).or_insert(0) += 1;
        }
    }
    tally
}

/// Serializable frequency payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Ranked side.
    pub side: Side,
    /// Number of ranked decision points.
    pub total_nodes: usize,
    /// Hash of the configuration the report was computed under.
    pub config_hash: String,
    /// Ranked moves keyed by position identity.
    pub rankings: BTreeMap<Position, Vec<MoveCount>>,
}

impl FrequencyReport {
    /// Wrap a table for output.
    pub fn new(table: FrequencyTable, config_hash: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            side: table.side,
            total_nodes: table.entries.len(),
            config_hash: config_hash.into(),
            rankings: table.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_order_and_tie_break() {
        let mut rep = Repertoire::new(Side::Black);
        rep.ingest(&["e4", "e5"]).unwrap();
        rep.ingest(&["e4", "c5"]).unwrap();
        rep.ingest(&["e4", "c5"]).unwrap();
        rep.ingest(&["e4", "e6"]).unwrap();

        let table = frequencies(&rep);
        let after_e4 = rep.root_node().child("e4").unwrap().child;
        let position = rep.node(after_e4).unwrap().position();
        let ranked: Vec<(&str, u64)> = table
            .get(position)
            .unwrap()
            .iter()
            .map(|m| (m.notation.as_str(), m.count))
            .collect();
        assert_eq!(ranked, vec![("c5", 2), ("e5", 1), ("e6", 1)]);
        // Root is an opponent node for black and is not ranked.
        assert!(table.get(rep.root_node().position()).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_transpositions_pool_counts() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4", "e5", "Nf3", "Nc6", "Bb5"]).unwrap();
        rep.ingest(&["Nf3", "Nc6", "e4", "e5", "Bb5"]).unwrap();
        rep.ingest(&["Nf3", "Nc6", "e4", "e5", "Bc4"]).unwrap();

        let table = frequencies(&rep);
        let shared = rep.node_after(&["e4", "e5", "Nf3", "Nc6"]).unwrap();
        let ranked = table.get(shared.position()).unwrap();
        assert_eq!(ranked[0].notation, "Bb5");
        assert_eq!(ranked[0].count, 2);
        assert_eq!(ranked[1].notation, "Bc4");
    }

    #[test]
    fn test_empty_repertoire_gives_empty_table() {
        let rep = Repertoire::new(Side::White);
        assert!(frequencies(&rep).is_empty());
        assert!(fingerprint_frequencies(&rep).is_empty());
    }

    #[test]
    fn test_fingerprint_tally() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["Nf3", "d5", "d4"]).unwrap();
        rep.ingest(&["Nf3", "Nf6", "d4"]).unwrap();
        let tally = fingerprint_frequencies(&rep);
        let d4 = MoveFingerprint {
            piece: 'P',
            from: "d2".to_string(),
            to: "d4".to_string(),
        };
        assert_eq!(tally.get(&d4), Some(&2));
        assert_eq!(tally.values().sum::<u64>(), 3);
    }

    #[test]
    fn test_report_serializes_positions_as_keys() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4"]).unwrap();
        let report = FrequencyReport::new(frequencies(&rep), "abc");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["side"], "white");
        assert_eq!(json["total_nodes"], 1);
        let key = rep.root_node().position().as_str();
        assert_eq!(json["rankings"][key][0]["notation"], "e4");
    }
}
