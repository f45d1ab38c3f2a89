//! Node and edge types for the repertoire graph.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use shakmaty::{Move, Role, Square};

use super::metadata::NodeMetadata;
use super::position::{Position, Side};

/// Non-owning index of a node in a repertoire's arena.
///
/// Many parents may hold the same `NodeRef`; the node itself lives once in
/// the repertoire's node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef(u32);

impl NodeRef {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Index into the node table.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Piece, origin and destination of a move, independent of notation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoveFingerprint {
    /// Uppercase piece letter (`P`, `N`, `B`, `R`, `Q`, `K`).
    pub piece: char,
    /// Origin square name.
    pub from: String,
    /// Destination square name.
    pub to: String,
}

impl MoveFingerprint {
    /// Fingerprint a move. Returns `None` for drops, which have no origin.
    pub fn from_move(mv: &Move) -> Option<Self> {
        let from: Square = mv.from()?;
        Some(Self {
            piece: role_letter(mv.role()),
            from: from.to_string(),
            to: mv.to().to_string(),
        })
    }
}

impl fmt::Display for MoveFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.piece, self.from, self.to)
    }
}

fn role_letter(role: Role) -> char {
    role.char().to_ascii_uppercase()
}

/// Outgoing edge of a node, keyed by its SAN notation in the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Normalized SAN, including check and mate suffixes.
    pub notation: String,
    /// Coordinate form of the same move.
    pub uci: String,
    /// Piece/from/to of the move.
    pub fingerprint: MoveFingerprint,
    /// Resulting node.
    pub child: NodeRef,
    /// Number of ingested lines that took this edge.
    pub count: u64,
}

/// One canonical position reachable from the repertoire root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeRef,
    pub(crate) position: Position,
    pub(crate) display: String,
    pub(crate) side_to_move: Side,
    pub(crate) ply: u32,
    pub(crate) children: BTreeMap<String, Edge>,
    pub(crate) parents: BTreeSet<NodeRef>,
    pub(crate) visits: u64,
    pub(crate) metadata: NodeMetadata,
}

impl Node {
    pub(crate) fn new(
        id: NodeRef,
        position: Position,
        display: String,
        side_to_move: Side,
        ply: u32,
    ) -> Self {
        Self {
            id,
            position,
            display,
            side_to_move,
            ply,
            children: BTreeMap::new(),
            parents: BTreeSet::new(),
            visits: 0,
            metadata: NodeMetadata::default(),
        }
    }

    /// Arena index of this node.
    pub fn id(&self) -> NodeRef {
        self.id
    }

    /// Canonical identity.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Display FEN as first reached, counters included.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Side to move, fixed when the node was created.
    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    /// Ply distance from the root along the line that first created the node.
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Outgoing edges in ascending notation order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = &Edge> + ExactSizeIterator {
        self.children.values()
    }

    /// Look up an outgoing edge by notation.
    pub fn child(&self, notation: &str) -> Option<&Edge> {
        self.children.get(notation)
    }

    /// Number of outgoing edges.
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Whether the node has no outgoing edges.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Parent nodes (ordered by `NodeRef`).
    pub fn parents(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.parents.iter().copied()
    }

    /// Whether more than one parent reaches this node.
    pub fn is_shared(&self) -> bool {
        self.parents.len() > 1
    }

    /// Number of ingested lines that reached this node.
    pub fn visits(&self) -> u64 {
        self.visits
    }

    /// Attached tags.
    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    /// Sum of outgoing edge counters.
    pub fn continuation_count(&self) -> u64 {
        self.children.values().map(|edge| edge.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Chess, Position as _};
    use shakmaty::san::San;

    #[test]
    fn test_fingerprint_from_move() {
        let pos = Chess::default();
        let mv = San::from_ascii(b"Nf3").unwrap().to_move(&pos).unwrap();
        let fp = MoveFingerprint::from_move(&mv).unwrap();
        assert_eq!(fp.to_string(), "Ng1f3");

        let mv = San::from_ascii(b"e4").unwrap().to_move(&pos).unwrap();
        assert_eq!(MoveFingerprint::from_move(&mv).unwrap().piece, 'P');
        assert!(pos.is_legal(&mv));
    }

    #[test]
    fn test_node_ref_ordering() {
        assert!(NodeRef::new(1) < NodeRef::new(2));
        assert_eq!(NodeRef::new(7).index(), 7);
    }
}
