//! Position canonicalization.
//!
//! Turns a six-field position text into a stable identity key. Castling
//! rights are recomputed from the king and rook squares and the en-passant
//! target is kept only when a pawn of the side to move could actually make
//! that capture, so incidental FEN noise never splits one game state into
//! two nodes.
//!
//! Only structural validity is checked here. Whether the position is legal
//! chess (king counts, checks) is left to the board layer when a playable
//! board is needed.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode};

use crate::types::{CanonicalPosition, Position, Side};

/// Standard initial position.
pub const STANDARD_START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Error type for canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// Text does not have the six-field position structure.
    #[error("Malformed position '{text}': {reason}")]
    Malformed {
        /// Offending input.
        text: String,
        /// What was wrong.
        reason: String,
    },
    /// Structurally valid text that cannot seed a playable board.
    #[error("Unplayable position '{text}': {reason}")]
    Unplayable {
        /// Offending input.
        text: String,
        /// Rejection reported by the board layer.
        reason: String,
    },
}

impl PositionError {
    fn malformed(text: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// 8x8 grid of piece letters, `[rank][file]` with rank 0 = first rank.
struct Placement([[Option<char>; 8]; 8]);

impl Placement {
    fn parse(text: &str, field: &str) -> Result<Self, PositionError> {
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(PositionError::malformed(
                text,
                format!("placement has {} ranks", ranks.len()),
            ));
        }
        let mut grid = [[None; 8]; 8];
        for (row, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - row;
            let mut file = 0usize;
            for c in rank_text.chars() {
                match c {
                    '1'..='8' => file += c as usize - '0' as usize,
                    'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => {
                        if file < 8 {
                            grid[rank][file] = Some(c);
                        }
                        file += 1;
                    }
                    other => {
                        return Err(PositionError::malformed(
                            text,
                            format!("unexpected placement character '{other}'"),
                        ))
                    }
                }
                if file > 8 {
                    break;
                }
            }
            if file != 8 {
                return Err(PositionError::malformed(
                    text,
                    format!("rank {} does not span eight files", rank + 1),
                ));
            }
        }
        Ok(Self(grid))
    }

    fn at(&self, file: i32, rank: i32) -> Option<char> {
        if !(0..8).contains(&file) || !(0..8).contains(&rank) {
            return None;
        }
        self.0[rank as usize][file as usize]
    }

    fn is(&self, file: i32, rank: i32, piece: char) -> bool {
        self.at(file, rank) == Some(piece)
    }

    fn is_empty(&self, file: i32, rank: i32) -> bool {
        self.at(file, rank).is_none()
    }
}

fn corrected_castling(text: &str, field: &str, placement: &Placement) -> Result<String, PositionError> {
    if field == "-" {
        return Ok("-".to_string());
    }
    let mut requested = [false; 4];
    for c in field.chars() {
        let slot = match c {
            'K' => 0,
            'Q' => 1,
            'k' => 2,
            'q' => 3,
            other => {
                return Err(PositionError::malformed(
                    text,
                    format!("unsupported castling flag '{other}'"),
                ))
            }
        };
        if requested[slot] {
            return Err(PositionError::malformed(text, format!("duplicate castling flag '{c}'")));
        }
        requested[slot] = true;
    }

    // (flag, king, king square, rook, rook square)
    const RULES: [(char, char, (i32, i32), char, (i32, i32)); 4] = [
        ('K', 'K', (4, 0), 'R', (7, 0)),
        ('Q', 'K', (4, 0), 'R', (0, 0)),
        ('k', 'k', (4, 7), 'r', (7, 7)),
        ('q', 'k', (4, 7), 'r', (0, 7)),
    ];
    let mut out = String::new();
    for (slot, (flag, king, king_sq, rook, rook_sq)) in RULES.iter().enumerate() {
        if requested[slot]
            && placement.is(king_sq.0, king_sq.1, *king)
            && placement.is(rook_sq.0, rook_sq.1, *rook)
        {
            out.push(*flag);
        }
    }
    if out.is_empty() {
        out.push('-');
    }
    Ok(out)
}

fn corrected_en_passant(
    text: &str,
    field: &str,
    side: Side,
    placement: &Placement,
) -> Result<String, PositionError> {
    if field == "-" {
        return Ok("-".to_string());
    }
    let bytes = field.as_bytes();
    if bytes.len() != 2 || !(b'a'..=b'h').contains(&bytes[0]) || !(b'1'..=b'8').contains(&bytes[1]) {
        return Err(PositionError::malformed(
            text,
            format!("invalid en-passant field '{field}'"),
        ));
    }
    let file = (bytes[0] - b'a') as i32;
    let rank = (bytes[1] - b'1') as i32;

    // Target rank, rank of the pushed pawn, its origin rank, capturer and victim.
    let (target_rank, pawn_rank, origin_rank, capturer, victim) = match side {
        Side::White => (5, 4, 6, 'P', 'p'),
        Side::Black => (2, 3, 1, 'p', 'P'),
    };
    let available = rank == target_rank
        && placement.is(file, pawn_rank, victim)
        && placement.is_empty(file, target_rank)
        && placement.is_empty(file, origin_rank)
        && (placement.is(file - 1, pawn_rank, capturer)
            || placement.is(file + 1, pawn_rank, capturer));

    Ok(if available { field.to_string() } else { "-".to_string() })
}

/// Canonicalize a six-field position text.
///
/// Deterministic and pure. `canonicalize(&canonicalize(p)?.display)` yields
/// the same identity as `canonicalize(p)`.
pub fn canonicalize(text: &str) -> Result<CanonicalPosition, PositionError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(PositionError::malformed(
            text,
            format!("expected 6 fields, found {}", fields.len()),
        ));
    }

    let placement = Placement::parse(text, fields[0])?;
    let side = match fields[1] {
        "w" => Side::White,
        "b" => Side::Black,
        other => {
            return Err(PositionError::malformed(
                text,
                format!("invalid side to move '{other}'"),
            ))
        }
    };
    let castling = corrected_castling(text, fields[2], &placement)?;
    let en_passant = corrected_en_passant(text, fields[3], side, &placement)?;
    let halfmoves: u32 = fields[4]
        .parse()
        .map_err(|_| PositionError::malformed(text, format!("invalid halfmove clock '{}'", fields[4])))?;
    let fullmoves: u32 = fields[5]
        .parse()
        .map_err(|_| PositionError::malformed(text, format!("invalid fullmove number '{}'", fields[5])))?;
    let fullmoves = fullmoves.max(1);

    let corrected = format!(
        "{} {} {} {} {} {}",
        fields[0], fields[1], castling, en_passant, halfmoves, fullmoves
    );
    let display = Fen::from_ascii(corrected.as_bytes())
        .map_err(|err| PositionError::malformed(text, err.to_string()))?
        .to_string();
    let identity = {
        let key: Vec<&str> = display.split(' ').take(4).collect();
        format!("{} 0 1", key.join(" "))
    };

    Ok(CanonicalPosition {
        identity: Position::from_canonical(identity),
        display,
        side_to_move: side,
    })
}

/// Canonicalize a live board.
pub fn canonicalize_board(board: &Chess) -> Result<CanonicalPosition, PositionError> {
    // Always mode keeps every double-push target; `canonicalize` then applies
    // the same geometric filter used for text input.
    let text = Fen::from_position(board.clone(), EnPassantMode::Always).to_string();
    canonicalize(&text)
}

/// Build a playable board from a position text.
pub fn board_from_text(text: &str) -> Result<Chess, PositionError> {
    let canonical = canonicalize(text)?;
    let fen = Fen::from_ascii(canonical.display.as_bytes())
        .map_err(|err| PositionError::malformed(text, err.to_string()))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|err| PositionError::Unplayable {
            text: text.to_string(),
            reason: err.to_string(),
        })
}
