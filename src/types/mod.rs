//! Core types for the repertoire graph.

pub mod position;
pub mod node;
pub mod metadata;
pub mod chunk;

pub use position::{Position, Side, CanonicalPosition};
pub use node::{NodeRef, Node, Edge, MoveFingerprint};
pub use metadata::{NodeMetadata, extract_reach_count, upsert_reach_count_tag};
pub use chunk::Chunk;
