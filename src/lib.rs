//! # repertoire-graph
//!
//! Transposition-aware chess repertoire graphs.
//!
//! A repertoire is every position reachable through a set of ingested lines,
//! stored once per canonical position no matter how many move orders reach
//! it. On top of the graph the crate answers three questions
//! deterministically:
//!
//! > How often was each move taken at my decision points? Which single move
//! > do I keep at each of them? How do I cut the result into replayable pieces?
//!
//! ## Architecture
//!
//! ```text
//! lines → notation → canonicalizer → Repertoire (arena + index)
//!                                         ↓
//!              frequencies / prune / split / rows / snapshot
//! ```
//!
//! Collaborators (engine analysis, game statistics) sit behind the
//! [`provider`] traits and feed the graph only through ingestion.
//!
//! ## Determinism Guarantees
//!
//! - Same lines in any order → identical graph structure and snapshot id
//! - Children are ordered by notation; every walk follows that order
//! - Frequency ties break on notation, so pruning is a pure function

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod canonicalizer;
pub mod notation;
pub mod graph;
pub mod frequency;
pub mod pruner;
pub mod splitter;
pub mod export;
pub mod config;
pub mod provider;

// Re-exports
pub use types::{
    CanonicalPosition, Chunk, Edge, MoveFingerprint, Node, NodeMetadata, NodeRef, Position, Side,
};
pub use canonicalizer::{canonicalize, PositionError, STANDARD_START};
pub use notation::tokenize_line;
pub use graph::{
    BatchReport, GraphError, IngestOutcome, Leaves, LineErrorPolicy, LineRequest, RejectedLine,
    Repertoire, RepertoireSnapshot, Traversal,
};
pub use frequency::{fingerprint_frequencies, frequencies, FrequencyReport, FrequencyTable, MoveCount};
pub use pruner::{prune, select_move};
pub use splitter::{split, Split};
pub use export::{chunk_label, compact_labels, numbered_moves, rows, Row, RowOptions};
pub use config::{ConfigError, EngineConfig};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use provider::{
    AnalysisProvider, CachingAnalysisProvider, Candidate, ObservedMove, ProviderError,
    StatisticsProvider,
};
#[cfg(feature = "async")]
pub use provider::{RepertoireWriter, WriterHandle};

/// Schema version for all exported repertoire types.
/// Increment on breaking changes to any schema type.
pub const REPERTOIRE_SCHEMA_VERSION: &str = "1.0.0";
