//! Movetext tokenizing and move resolution.
//!
//! Lines arrive as PGN-style movetext or as bare token lists. Tokens may be
//! SAN (`Nf3`, `exd5`, `O-O`) or coordinate form (`g1f3`, `e7e8q`); both
//! resolve to the same edge because edges are keyed by the SAN the board
//! renders for the move.

use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Move};

use crate::types::MoveFingerprint;

/// A token resolved against a board.
#[derive(Debug, Clone)]
pub struct ResolvedMove {
    /// The move itself.
    pub mv: Move,
    /// Normalized SAN including `+`/`#`.
    pub san: String,
    /// Coordinate notation.
    pub uci: String,
    /// Piece/from/to.
    pub fingerprint: MoveFingerprint,
}

/// Resolve one notation token on `board`.
///
/// Returns `None` when the token is neither a legal SAN move nor a legal
/// coordinate move in this position.
pub fn resolve(board: &Chess, token: &str) -> Option<ResolvedMove> {
    let token = token.trim();
    let mv = San::from_ascii(san_text(token).as_bytes())
        .ok()
        .and_then(|san| san.to_move(board).ok())
        .or_else(|| {
            UciMove::from_ascii(token.as_bytes())
                .ok()
                .and_then(|uci| uci.to_move(board).ok())
        })?;
    let fingerprint = MoveFingerprint::from_move(&mv)?;
    let san = SanPlus::from_move(board.clone(), &mv).to_string();
    let uci = UciMove::from_move(&mv, CastlingMode::Standard).to_string();
    Some(ResolvedMove {
        mv,
        san,
        uci,
        fingerprint,
    })
}

/// Drop check/mate marks and `!`/`?` annotation glyphs after a SAN token.
fn strip_annotations(token: &str) -> &str {
    token.trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'))
}

/// SAN text to parse: annotations stripped, zero-digit castling (`0-0`,
/// `0-0-0`) spelled with letters.
fn san_text(token: &str) -> &str {
    match strip_annotations(token) {
        "0-0" => "O-O",
        "0-0-0" => "O-O-O",
        other => other,
    }
}

fn is_result(token: &str) -> bool {
    matches!(token, "*" | "1-0" | "0-1" | "1/2-1/2")
}

/// Split movetext into move tokens.
///
/// Skips move numbers (`1.`, `12...`, the glued `1.e4` form keeps `e4`),
/// brace comments, NAGs, tag pairs and parenthesized variations, and stops
/// at a game result.
pub fn tokenize_line(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut depth: usize = 0;
    let mut in_comment = false;
    let mut in_tag = false;

    // Pad delimiters so they always split from neighbouring tokens.
    let spaced: String = text
        .chars()
        .flat_map(|c| match c {
            '{' | '}' | '(' | ')' | '[' | ']' => vec![' ', c, ' '],
            _ => vec![c],
        })
        .collect();

    for raw in spaced.split_whitespace() {
        if in_comment {
            if raw == "}" {
                in_comment = false;
            }
            continue;
        }
        if in_tag {
            if raw == "]" {
                in_tag = false;
            }
            continue;
        }
        match raw {
            "{" => {
                in_comment = true;
                continue;
            }
            "[" => {
                in_tag = true;
                continue;
            }
            "(" => {
                depth += 1;
                continue;
            }
            ")" => {
                depth = depth.saturating_sub(1);
                continue;
            }
            _ => {}
        }
        if depth > 0 || raw.starts_with('$') {
            continue;
        }
        if is_result(raw) {
            break;
        }
        let token = match raw.rfind('.') {
            Some(idx) => &raw[idx + 1..],
            None => raw,
        };
        if token.is_empty() || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        tokens.push(token.to_string());
    }
    tokens
}

/// Parse a PGN tag pair line such as `[Event "Club"]`.
pub fn parse_tag_pair(line: &str) -> Option<(String, String)> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    let (name, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.replace("\\\"", "\"")))
}
