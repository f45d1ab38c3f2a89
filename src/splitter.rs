//! Splitting a repertoire into bounded chunks.
//!
//! Each chunk is a notation path from its own root position, at most
//! `max_plies` long. A chunk closes when it
//!
//! - reaches `max_plies`,
//! - reaches a leaf, or
//! - arrives at a shared node (several parents).
//!
//! A chunk that closes at a non-leaf schedules that node as a new chunk root.
//! Each chunk root is walked once, so the continuation of a shared node is
//! emitted once no matter how many move orders lead to it.
//!
//! Chunks come out depth first: a chunk's continuations follow it before its
//! siblings.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::graph::Repertoire;
use crate::types::{Chunk, NodeRef};

#[derive(Debug, Clone)]
struct Frame<'a> {
    node: NodeRef,
    depth: usize,
    via: Option<&'a str>,
}

#[derive(Debug, Clone)]
struct Walk<'a> {
    root: NodeRef,
    prefix: Vec<String>,
    frames: Vec<Frame<'a>>,
    path: Vec<&'a str>,
}

impl<'a> Walk<'a> {
    fn new(root: NodeRef, prefix: Vec<String>) -> Self {
        Self {
            root,
            prefix,
            frames: vec![Frame {
                node: root,
                depth: 0,
                via: None,
            }],
            path: Vec::new(),
        }
    }
}

/// Lazy chunk sequence returned by [`split`].
///
/// Single pass: the iterator is consumed as it goes.
#[derive(Debug)]
pub struct Split<'a> {
    repertoire: &'a Repertoire,
    max_plies: usize,
    walks: Vec<Walk<'a>>,
    scheduled: HashSet<NodeRef>,
}

impl<'a> Split<'a> {
    /// Ply cap in effect (at least 1).
    pub fn max_plies(&self) -> usize {
        self.max_plies
    }
}

impl<'a> Iterator for Split<'a> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let repertoire = self.repertoire;
        loop {
            let walk = self.walks.last_mut()?;
            let Some(frame) = walk.frames.pop() else {
                self.walks.pop();
                continue;
            };

            walk.path.truncate(frame.depth);
            if let Some(notation) = frame.via {
                walk.path.push(notation);
            }
            let depth = walk.path.len();
            let Some(node) = repertoire.node(frame.node) else {
                continue;
            };

            let closes = depth > 0 && (node.is_leaf() || depth >= self.max_plies || node.is_shared());
            if !closes {
                walk.frames.extend(node.children().rev().map(|edge| Frame {
                    node: edge.child,
                    depth,
                    via: Some(edge.notation.as_str()),
                }));
                continue;
            }

            let Some(root) = repertoire.node(walk.root) else {
                continue;
            };
            let chunk = Chunk {
                root_position: root.position().clone(),
                root_display: root.display().to_string(),
                prefix: walk.prefix.clone(),
                moves: walk.path.iter().map(|s| s.to_string()).collect(),
                ply_count: depth,
            };

            if !node.is_leaf() && self.scheduled.insert(node.id()) {
                self.walks.push(Walk::new(node.id(), chunk.full_line()));
            }
            return Some(chunk);
        }
    }
}

/// Split `repertoire` into chunks of at most `max_plies` plies.
///
/// `max_plies` below 1 is treated as 1, so every chunk holds at least one
/// move. An empty repertoire yields no chunks.
pub fn split(repertoire: &Repertoire, max_plies: usize) -> Split<'_> {
    let max_plies = max_plies.max(1);
    let mut scheduled = HashSet::new();
    let walks = if repertoire.is_empty() {
        warn!(side = %repertoire.side(), "split requested on empty repertoire");
        Vec::new()
    } else {
        scheduled.insert(repertoire.root());
        vec![Walk::new(repertoire.root(), Vec::new())]
    };
    debug!(max_plies, nodes = repertoire.num_nodes(), "splitting repertoire");
    Split {
        repertoire,
        max_plies,
        walks,
        scheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn moves(chunk: &Chunk) -> Vec<&str> {
        chunk.moves.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_four_plies_in_two_chunks() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4", "e5", "Nf3", "Nc6"]).unwrap();

        let chunks: Vec<Chunk> = split(&rep, 2).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(moves(&chunks[0]), vec!["e4", "e5"]);
        assert_eq!(moves(&chunks[1]), vec!["Nf3", "Nc6"]);
        assert_eq!(chunks[0].root_position, *rep.root_node().position());
        let after_e5 = rep.node_after(&["e4", "e5"]).unwrap();
        assert_eq!(chunks[1].root_position, *after_e5.position());
        assert_eq!(chunks[1].prefix, vec!["e4", "e5"]);
        assert!(chunks.iter().all(|c| c.ply_count == 2));
    }

    #[test]
    fn test_zero_cap_still_emits_single_moves() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["d4", "d5", "c4"]).unwrap();
        let split = split(&rep, 0);
        assert_eq!(split.max_plies(), 1);
        let chunks: Vec<Chunk> = split.collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.ply_count == 1 && c.moves.len() == 1));
    }

    #[test]
    fn test_branches_and_short_lines() {
        let mut rep = Repertoire::new(Side::Black);
        rep.ingest(&["e4", "c5", "Nf3", "d6"]).unwrap();
        rep.ingest(&["e4", "e5"]).unwrap();
        rep.ingest(&["d4"]).unwrap();

        let chunks: Vec<Vec<String>> = split(&rep, 3).map(|c| c.full_line()).collect();
        assert_eq!(
            chunks,
            vec![
                vec!["d4".to_string()],
                vec!["e4".into(), "c5".into(), "Nf3".into()],
                vec!["e4".into(), "c5".into(), "Nf3".into(), "d6".into()],
                vec!["e4".into(), "e5".into()],
            ]
        );
    }

    #[test]
    fn test_shared_continuation_emitted_once() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]).unwrap();
        rep.ingest(&["Nf3", "Nc6", "e4", "e5"]).unwrap();

        let chunks: Vec<Chunk> = split(&rep, 10).collect();
        let shared = rep.node_after(&["e4", "e5", "Nf3", "Nc6"]).unwrap();
        let from_shared: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.root_position == *shared.position())
            .collect();
        assert_eq!(from_shared.len(), 1);
        assert_eq!(moves(from_shared[0]), vec!["Bb5", "a6"]);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_empty_repertoire_has_no_chunks() {
        let rep = Repertoire::new(Side::White);
        assert_eq!(split(&rep, 4).count(), 0);
    }
}
