//! Position identity types.

use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::fmt;

/// Canonical identity of a chess position.
///
/// Holds a six-field FEN whose castling rights and en-passant target have
/// been corrected and whose move counters are fixed to `0 1`, so two texts
/// for the same game state always produce the same key. Implements `Ord`
/// for deterministic ordering of exported tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    pub(crate) fn from_canonical(text: String) -> Self {
        Self(text)
    }

    /// Get the identity text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four identity-bearing fields (placement, side, castling, en passant).
    pub fn key_fields(&self) -> &str {
        self.0
            .match_indices(' ')
            .nth(3)
            .map(|(idx, _)| &self.0[..idx])
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Position {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Side of the board.
///
/// Used both as the repertoire owner and as a node's side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// White pieces.
    White,
    /// Black pieces.
    Black,
}

impl Side {
    /// Parse side from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "white" | "w" => Some(Self::White),
            "black" | "b" => Some(Self::Black),
            _ => None,
        }
    }

    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl Default for Side {
    fn default() -> Self {
        Self::White
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// Result of canonicalizing a position text.
///
/// The identity drives deduplication; the display form keeps the original
/// move counters for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPosition {
    /// Identity key.
    pub identity: Position,
    /// Six-field display form with corrected rights and original counters.
    pub display: String,
    /// Side to move.
    pub side_to_move: Side,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_fields_drop_counters() {
        let position = Position::from_canonical(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string(),
        );
        assert_eq!(
            position.key_fields(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!(Side::from_str("White"), Some(Side::White));
        assert_eq!(Side::from_str("b"), Some(Side::Black));
        assert_eq!(Side::from_str("red"), None);
        assert_eq!(Side::White.opponent(), Side::Black);
    }
}
