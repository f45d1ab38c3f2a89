//! Lazy depth-first walks over a repertoire.
//!
//! Both iterators borrow the repertoire immutably and keep their own explicit
//! stack, so depth is bounded by memory rather than the call stack. Dropping
//! an iterator mid-walk is the only cancellation there is.

use std::collections::HashSet;

use crate::types::{Node, NodeRef};

use super::Repertoire;

#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    node: NodeRef,
    depth: usize,
    via: Option<&'a str>,
}

/// Every path from a start node to each of its descendants, in ascending
/// notation order (pre-order).
///
/// A node reachable by several move orders is yielded once per path.
#[derive(Debug, Clone)]
pub struct Traversal<'a> {
    repertoire: &'a Repertoire,
    stack: Vec<Frame<'a>>,
    path: Vec<&'a str>,
}

impl<'a> Traversal<'a> {
    fn new(repertoire: &'a Repertoire, start: NodeRef) -> Self {
        let stack = if repertoire.node(start).is_some() {
            vec![Frame {
                node: start,
                depth: 0,
                via: None,
            }]
        } else {
            Vec::new()
        };
        Self {
            repertoire,
            stack,
            path: Vec::new(),
        }
    }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = (Vec<&'a str>, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.stack.pop()?;
        let repertoire = self.repertoire;
        let node = &repertoire.nodes[frame.node.index()];

        self.path.truncate(frame.depth);
        if let Some(notation) = frame.via {
            self.path.push(notation);
        }

        let depth = self.path.len();
        // Reverse so the smallest notation is popped first.
        self.stack.extend(node.children.values().rev().map(|edge| Frame {
            node: edge.child,
            depth,
            via: Some(edge.notation.as_str()),
        }));

        Some((self.path.clone(), node))
    }
}

/// Distinct leaf nodes in first-reached depth-first order.
#[derive(Debug, Clone)]
pub struct Leaves<'a> {
    repertoire: &'a Repertoire,
    stack: Vec<NodeRef>,
    visited: HashSet<NodeRef>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }
            let repertoire = self.repertoire;
            let node = &repertoire.nodes[id.index()];
            if node.is_leaf() {
                return Some(node);
            }
            self.stack
                .extend(node.children.values().rev().map(|edge| edge.child));
        }
        None
    }
}

impl Repertoire {
    /// Walk every path below `start`, `start` itself first with an empty path.
    ///
    /// An unknown `start` yields nothing.
    pub fn traverse_from(&self, start: NodeRef) -> Traversal<'_> {
        Traversal::new(self, start)
    }

    /// [`traverse_from`](Self::traverse_from) the root.
    pub fn traverse(&self) -> Traversal<'_> {
        Traversal::new(self, self.root)
    }

    /// Leaf nodes reachable from the root, each once.
    ///
    /// Recomputed on every call. A repertoire with no moves has no leaves.
    pub fn leaves(&self) -> Leaves<'_> {
        let stack = if self.is_empty() { Vec::new() } else { vec![self.root] };
        Leaves {
            repertoire: self,
            stack,
            visited: HashSet::new(),
        }
    }

    /// Every root-to-leaf notation path, in traversal order.
    pub fn lines(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.traverse()
            .filter(|(path, node)| node.is_leaf() && !path.is_empty())
            .map(|(path, _)| path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn sample() -> Repertoire {
        let mut rep = Repertoire::new(Side::White);
        rep.ingest(&["e4", "e5", "Nf3", "Nc6"]).unwrap();
        rep.ingest(&["e4", "c5"]).unwrap();
        rep.ingest(&["d4", "d5"]).unwrap();
        rep
    }

    #[test]
    fn test_traversal_is_sorted_preorder() {
        let rep = sample();
        let paths: Vec<String> = rep.traverse().map(|(path, _)| path.join(" ")).collect();
        assert_eq!(
            paths,
            vec!["", "d4", "d4 d5", "e4", "e4 c5", "e4 e5", "e4 e5 Nf3", "e4 e5 Nf3 Nc6"]
        );
    }

    #[test]
    fn test_traverse_from_inner_node() {
        let rep = sample();
        let e4 = rep.root_node().child("e4").unwrap().child;
        let paths: Vec<Vec<&str>> = rep.traverse_from(e4).map(|(path, _)| path).collect();
        assert_eq!(paths.len(), 5);
        assert!(paths[0].is_empty());
        assert_eq!(paths[1], vec!["c5"]);
    }

    #[test]
    fn test_leaves_are_distinct() {
        let mut rep = sample();
        // Transposes into the node after 1.e4 e5 2.Nf3 Nc6.
        rep.ingest(&["Nf3", "Nc6", "e4", "e5"]).unwrap();
        let leaves: Vec<NodeRef> = rep.leaves().map(Node::id).collect();
        assert_eq!(leaves.len(), 3);
        let unique: HashSet<_> = leaves.iter().collect();
        assert_eq!(unique.len(), leaves.len());
        // Two distinct paths end at the shared leaf.
        assert_eq!(rep.lines().count(), 4);
    }

    #[test]
    fn test_empty_repertoire_walks() {
        let rep = Repertoire::new(Side::Black);
        assert_eq!(rep.leaves().count(), 0);
        assert_eq!(rep.traverse().count(), 1);
        assert_eq!(rep.lines().count(), 0);
        assert_eq!(rep.traverse_from(NodeRef::new(42)).count(), 0);
    }
}
