//! Row export and chunk labels.
//!
//! Produces the plain data an external CSV or PGN writer needs; no text
//! formats are written here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::graph::Repertoire;
use crate::types::metadata::{TAG_ECO, TAG_VARIATION};
use crate::types::{Chunk, Side};

/// One exported root-to-leaf line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// 1-based sequence number, assigned after filtering and sorting.
    pub id: usize,
    /// Human description of the line.
    pub description: String,
    /// Display FEN of the repertoire root.
    pub root_display: String,
    /// Space-separated notation from the root.
    pub moves: String,
    /// Reach count recorded on the leaf, 0 when absent.
    pub games_reached: u64,
}

/// Options for [`rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOptions {
    /// Tokens used for the fallback description.
    pub description_plies: usize,
    /// Truncate lines to this many plies.
    pub max_plies: Option<usize>,
    /// Skip lines shorter than this after truncation.
    pub min_plies: Option<usize>,
    /// Drop rows whose (truncated) move text was already emitted.
    pub dedupe: bool,
    /// Order rows by reach count, highest first.
    pub sort_by_games_reached: bool,
}

impl Default for RowOptions {
    fn default() -> Self {
        Self {
            description_plies: 6,
            max_plies: None,
            min_plies: None,
            dedupe: false,
            sort_by_games_reached: false,
        }
    }
}

/// One row per root-to-leaf path, in traversal order.
pub fn rows(repertoire: &Repertoire, options: &RowOptions) -> Vec<Row> {
    let root_display = repertoire.root_node().display().to_string();
    let min_plies = options.min_plies.unwrap_or(0);
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows: Vec<Row> = Vec::new();

    for (path, leaf) in repertoire.traverse().filter(|(_, node)| node.is_leaf()) {
        let limited = match options.max_plies {
            Some(cap) => &path[..path.len().min(cap)],
            None => &path[..],
        };
        if limited.is_empty() || limited.len() < min_plies {
            continue;
        }
        let moves = limited.join(" ");
        if options.dedupe && !seen.insert(moves.clone()) {
            continue;
        }

        let description = [TAG_VARIATION, TAG_ECO]
            .iter()
            .find_map(|tag| leaf.metadata().get_known(tag))
            .or_else(|| {
                [TAG_VARIATION, TAG_ECO]
                    .iter()
                    .find_map(|tag| repertoire.headers().get_known(tag))
            })
            .map(str::to_string)
            .unwrap_or_else(|| {
                limited
                    .iter()
                    .take(options.description_plies)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ")
            });

        rows.push(Row {
            id: 0,
            description,
            root_display: root_display.clone(),
            moves,
            games_reached: leaf.metadata().games_reached().unwrap_or(0),
        });
    }

    if options.sort_by_games_reached {
        rows.sort_by(|a, b| b.games_reached.cmp(&a.games_reached));
    }
    for (i, row) in rows.iter_mut().enumerate() {
        row.id = i + 1;
    }
    rows
}

fn side_and_fullmove(display: &str) -> (Side, u32) {
    let fields: Vec<&str> = display.split_whitespace().collect();
    let side = match fields.get(1) {
        Some(&"b") => Side::Black,
        _ => Side::White,
    };
    let fullmove = fields
        .get(5)
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);
    (side, fullmove)
}

fn advance(side: Side, fullmove: u32, plies: usize) -> (Side, u32) {
    (0..plies).fold((side, fullmove), |(side, number), _| match side {
        Side::White => (Side::Black, number),
        Side::Black => (Side::White, number + 1),
    })
}

fn numbered_from<S: AsRef<str>>(mut side: Side, mut number: u32, moves: &[S]) -> String {
    let mut tokens: Vec<String> = Vec::with_capacity(moves.len());
    for (i, mv) in moves.iter().enumerate() {
        let mv = mv.as_ref();
        match side {
            Side::White => tokens.push(format!("{number}.{mv}")),
            Side::Black if i == 0 => tokens.push(format!("{number}...{mv}")),
            Side::Black => tokens.push(mv.to_string()),
        }
        (side, number) = advance(side, number, 1);
    }
    tokens.join(" ")
}

/// Render `moves` with move numbers: `1.e4 e5 2.Nf3`.
///
/// Numbering starts from the side to move and fullmove number of
/// `start_display`; a black first move renders as `3...Nc6`.
pub fn numbered_moves<S: AsRef<str>>(start_display: &str, moves: &[S]) -> String {
    let (side, number) = side_and_fullmove(start_display);
    numbered_from(side, number, moves)
}

/// Label for a chunk: its numbered prefix from the repertoire root, or the
/// `Event` header (else `Start Position`) for chunks rooted at the root.
pub fn chunk_label(repertoire: &Repertoire, chunk: &Chunk) -> String {
    if chunk.prefix.is_empty() {
        return repertoire
            .headers()
            .get_known("Event")
            .unwrap_or("Start Position")
            .to_string();
    }
    numbered_moves(repertoire.root_node().display(), &chunk.prefix)
}

/// Labels with the prefix shared by every chunk removed.
///
/// `None` where nothing is left to show (no shared prefix at all, or the
/// chunk's prefix is the shared prefix).
pub fn compact_labels(repertoire: &Repertoire, chunks: &[Chunk]) -> Vec<Option<String>> {
    let shared = chunks
        .iter()
        .map(|c| c.prefix.len())
        .min()
        .map(|shortest| {
            (0..shortest)
                .take_while(|&i| chunks.iter().all(|c| c.prefix[i] == chunks[0].prefix[i]))
                .count()
        })
        .unwrap_or(0);
    if shared == 0 {
        return vec![None; chunks.len()];
    }

    let (side, number) = side_and_fullmove(repertoire.root_node().display());
    let (side, number) = advance(side, number, shared);
    chunks
        .iter()
        .map(|chunk| {
            let suffix = &chunk.prefix[shared..];
            (!suffix.is_empty()).then(|| numbered_from(side, number, suffix))
        })
        .collect()
}
