//! Principal-line pruning.
//!
//! Keeps every observed reply at opponent nodes and exactly one move at each
//! player node: the highest count, ties going to the smallest notation. The
//! result is a new [`Repertoire`]; the source is never touched.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::frequency::ranked_edges;
use crate::graph::Repertoire;
use crate::types::{Edge, Node, NodeRef};

/// The move a player node keeps.
pub fn select_move(node: &Node) -> Option<&Edge> {
    ranked_edges(node.children()).into_iter().next()
}

/// Reduce `repertoire` to one move per player node.
///
/// Pruning an already-pruned repertoire returns an equal one.
pub fn prune(repertoire: &Repertoire) -> Repertoire {
    let mut pruned = repertoire.derived();
    if repertoire.is_empty() {
        warn!(side = %repertoire.side(), "prune requested on empty repertoire");
        return pruned;
    }

    // (source node, node in `pruned`)
    let mut stack: Vec<(NodeRef, NodeRef)> = vec![(repertoire.root(), pruned.root())];
    let mut expanded: HashSet<NodeRef> = HashSet::new();

    while let Some((source_id, target_id)) = stack.pop() {
        if !expanded.insert(source_id) {
            continue;
        }
        let Some(source) = repertoire.node(source_id) else {
            continue;
        };

        let kept: Vec<&Edge> = if repertoire.is_player_node(source) {
            select_move(source).into_iter().collect()
        } else {
            source.children().collect()
        };

        for edge in kept.into_iter().rev() {
            let Some(child) = repertoire.node(edge.child) else {
                continue;
            };
            let grafted = pruned.graft(target_id, edge, child);
            stack.push((edge.child, grafted));
        }
    }

    info!(
        side = %repertoire.side(),
        source_nodes = repertoire.num_nodes(),
        pruned_nodes = pruned.num_nodes(),
        "repertoire pruned"
    );
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    #[test]
    fn test_player_node_keeps_most_frequent() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4", "e5"]).unwrap();
        rep.ingest(&["d4", "d5"]).unwrap();
        rep.ingest(&["d4", "Nf6"]).unwrap();

        let pruned = prune(&rep);
        assert_eq!(pruned.root_node().num_children(), 1);
        let d4 = pruned.root_node().child("d4").unwrap();
        assert_eq!(d4.count, 2);
        // Opponent node after 1.d4 keeps both replies.
        assert_eq!(pruned.node(d4.child).unwrap().num_children(), 2);
    }

    #[test]
    fn test_tie_goes_to_smallest_notation() {
        let mut rep = Repertoire::new(Side::Black);
        rep.ingest(&["e4", "e5"]).unwrap();
        rep.ingest(&["e4", "c5"]).unwrap();

        let pruned = prune(&rep);
        let after_e4 = pruned.node_after(&["e4"]).unwrap();
        let kept: Vec<&str> = after_e4.children().map(|e| e.notation.as_str()).collect();
        assert_eq!(kept, vec!["c5"]);
    }

    #[test]
    fn test_source_untouched_and_idempotent() {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4", "e5", "Nf3"]).unwrap();
        rep.ingest(&["e4", "e5", "Bc4"]).unwrap();
        rep.ingest(&["e4", "c5", "Nf3"]).unwrap();
        let before = rep.clone();

        let once = prune(&rep);
        let twice = prune(&once);
        assert_eq!(rep, before);
        assert_eq!(once, twice);
        assert!(once.num_nodes() < rep.num_nodes());
        assert!(once.nodes().filter(|n| once.is_player_node(n)).all(|n| n.num_children() <= 1));
    }

    #[test]
    fn test_shared_node_is_grafted_once() {
        let mut rep = Repertoire::new(Side::Black);
        rep.ingest(&["e4", "e5", "Nf3", "Nc6"]).unwrap();
        rep.ingest(&["Nf3", "Nc6", "e4", "e5"]).unwrap();
        rep.ingest(&["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]).unwrap();

        let pruned = prune(&rep);
        let a = pruned.node_after(&["e4", "e5", "Nf3", "Nc6"]).unwrap().id();
        let b = pruned.node_after(&["Nf3", "Nc6", "e4", "e5"]).unwrap().id();
        assert_eq!(a, b);
        assert!(pruned.node_after(&["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]).is_some());
    }

    #[test]
    fn test_empty_repertoire_prunes_to_root() {
        let rep = Repertoire::new(Side::White);
        let pruned = prune(&rep);
        assert!(pruned.is_empty());
        assert_eq!(pruned, rep);
    }
}
