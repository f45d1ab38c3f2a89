//! Chunk type produced by the splitter.

use serde::{Deserialize, Serialize};

use super::position::Position;

/// A bounded run of moves that can be replayed on its own.
///
/// `moves` is the notation path from `root_position`, never from the
/// repertoire root. `prefix` records how the chunk root was first reached
/// from the repertoire root, for labelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identity of the position the chunk starts from.
    pub root_position: Position,
    /// Display FEN of the chunk root.
    pub root_display: String,
    /// Notation path from the repertoire root to the chunk root.
    pub prefix: Vec<String>,
    /// Notation path from the chunk root.
    pub moves: Vec<String>,
    /// Number of plies in `moves`.
    pub ply_count: usize,
}

impl Chunk {
    /// Full notation path from the repertoire root through this chunk.
    pub fn full_line(&self) -> Vec<String> {
        self.prefix.iter().chain(self.moves.iter()).cloned().collect()
    }
}
