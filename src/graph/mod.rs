//! The repertoire graph.
//!
//! Nodes live in a flat arena (`Vec<Node>`) and are indexed by canonical
//! [`Position`]. Edges hold [`NodeRef`] indices, so any number of move orders
//! can reach one node without ownership cycles.
//!
//! ## Determinism Guarantees
//!
//! - Children are kept in ascending notation order
//! - Traversals walk children in that order with an explicit stack
//! - Nodes are appended to the arena in first-reached order

pub mod ingest;
pub mod traverse;
pub mod snapshot;

use std::collections::{BTreeMap, HashMap};

use shakmaty::Chess;

use crate::canonicalizer::{self, PositionError};
use crate::types::{Edge, Node, NodeMetadata, NodeRef, Position, Side};

pub use ingest::{BatchReport, IngestOutcome, LineErrorPolicy, LineRequest, RejectedLine};
pub use snapshot::RepertoireSnapshot;
pub use traverse::{Leaves, Traversal};

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Position text could not be canonicalized.
    #[error(transparent)]
    Position(#[from] PositionError),
    /// A notation token cannot be applied to the board at that ply.
    #[error("Illegal move '{notation}' at ply {ply} in position {position}")]
    IllegalMove {
        /// Offending token.
        notation: String,
        /// Display FEN of the board the token was applied to.
        position: String,
        /// 1-based ply of the token within its line.
        ply: usize,
    },
    /// Two derivations of one identity disagree on side to move.
    #[error("Identity conflict at {position}: recorded {recorded} to move, derived {derived}")]
    IdentityConflict {
        /// Conflicting identity.
        position: Position,
        /// Side stored on the existing node.
        recorded: Side,
        /// Side implied by the new derivation.
        derived: Side,
    },
    /// The line would make a node its own ancestor.
    #[error("Move '{notation}' returns to earlier position {position}")]
    Cycle {
        /// Move that closes the cycle.
        notation: String,
        /// Position that would be revisited.
        position: Position,
    },
    /// Nothing is reachable beyond the root.
    #[error("Repertoire has no moves beyond the root")]
    EmptyRepertoire,
}

impl GraphError {
    /// Whether the error only invalidates the line being ingested.
    ///
    /// Consistency errors return `false` and abort a whole batch.
    pub fn is_line_local(&self) -> bool {
        !matches!(self, Self::IdentityConflict { .. } | Self::EmptyRepertoire)
    }
}

/// A repertoire: one root position, the side that owns it, and every
/// position reachable through ingested lines.
#[derive(Debug, Clone)]
pub struct Repertoire {
    side: Side,
    root: NodeRef,
    nodes: Vec<Node>,
    index: HashMap<Position, NodeRef>,
    headers: NodeMetadata,
    start_board: Chess,
    lines_ingested: u64,
}

impl Repertoire {
    /// Create a repertoire rooted at the standard initial position.
    pub fn new(side: Side) -> Self {
        Self::from_start(side, canonicalizer::STANDARD_START)
            .expect("standard start position is valid")
    }

    /// Create a repertoire rooted at an arbitrary position.
    pub fn from_start(side: Side, start_position: &str) -> Result<Self, PositionError> {
        let canonical = canonicalizer::canonicalize(start_position)?;
        let start_board = canonicalizer::board_from_text(&canonical.display)?;
        let root = Node::new(
            NodeRef::new(0),
            canonical.identity.clone(),
            canonical.display,
            canonical.side_to_move,
            0,
        );
        let mut index = HashMap::new();
        index.insert(canonical.identity, root.id);
        Ok(Self {
            side,
            root: root.id,
            nodes: vec![root],
            index,
            headers: NodeMetadata::default(),
            start_board,
            lines_ingested: 0,
        })
    }

    /// An empty repertoire with the same side, root and headers.
    pub(crate) fn derived(&self) -> Self {
        let root = Node {
            id: NodeRef::new(0),
            children: BTreeMap::new(),
            parents: Default::default(),
            ..self.root_node().clone()
        };
        let mut index = HashMap::new();
        index.insert(root.position.clone(), root.id);
        Self {
            side: self.side,
            root: root.id,
            nodes: vec![root],
            index,
            headers: self.headers.clone(),
            start_board: self.start_board.clone(),
            lines_ingested: self.lines_ingested,
        }
    }

    /// Copy `edge` (taken from `source`) under `parent`, creating the child
    /// node from `source_child` if its position is new here.
    pub(crate) fn graft(&mut self, parent: NodeRef, edge: &Edge, source_child: &Node) -> NodeRef {
        let child = match self.index.get(&source_child.position) {
            Some(existing) => *existing,
            None => {
                let id = NodeRef::new(self.nodes.len());
                let ply = self.nodes[parent.index()].ply + 1;
                let node = Node {
                    id,
                    ply,
                    children: BTreeMap::new(),
                    parents: Default::default(),
                    ..source_child.clone()
                };
                self.index.insert(node.position.clone(), id);
                self.nodes.push(node);
                id
            }
        };
        self.nodes[child.index()].parents.insert(parent);
        self.nodes[parent.index()]
            .children
            .insert(edge.notation.clone(), Edge { child, ..edge.clone() });
        child
    }

    /// Side that owns the repertoire.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Root node reference.
    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// Root node.
    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root.index()]
    }

    /// Board at the root.
    pub fn start_board(&self) -> &Chess {
        &self.start_board
    }

    /// Node by reference.
    pub fn node(&self, id: NodeRef) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node by canonical identity.
    pub fn node_at(&self, position: &Position) -> Option<&Node> {
        self.index.get(position).and_then(|id| self.node(*id))
    }

    /// Canonicalize `text` and look up its node.
    pub fn node_for_text(&self, text: &str) -> Result<Option<&Node>, PositionError> {
        let canonical = canonicalizer::canonicalize(text)?;
        Ok(self.node_at(&canonical.identity))
    }

    /// Follow notation keys from the root.
    ///
    /// Keys must match stored edge notation exactly (normalized SAN).
    pub fn node_after<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        path.iter().try_fold(self.root_node(), |node, notation| {
            node.child(notation.as_ref()).and_then(|edge| self.node(edge.child))
        })
    }

    /// All nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes, root included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.nodes.iter().map(Node::num_children).sum()
    }

    /// Number of lines ingested (non-empty lines only).
    pub fn lines_ingested(&self) -> u64 {
        self.lines_ingested
    }

    /// Whether `node` is a decision point for the repertoire owner.
    pub fn is_player_node(&self, node: &Node) -> bool {
        node.side_to_move == self.side
    }

    /// Whether nothing is reachable beyond the root.
    pub fn is_empty(&self) -> bool {
        self.root_node().is_leaf()
    }

    /// `Err(EmptyRepertoire)` when nothing is reachable beyond the root.
    pub fn ensure_populated(&self) -> Result<(), GraphError> {
        if self.is_empty() {
            Err(GraphError::EmptyRepertoire)
        } else {
            Ok(())
        }
    }

    /// Repertoire-level tags (event name, ECO, ...).
    pub fn headers(&self) -> &NodeMetadata {
        &self.headers
    }

    /// Mutable repertoire-level tags.
    pub fn headers_mut(&mut self) -> &mut NodeMetadata {
        &mut self.headers
    }

    /// Sorted `(parent, notation, child, count)` list describing the graph.
    pub fn structure(&self) -> Vec<(Position, String, Position, u64)> {
        let mut edges: Vec<_> = self
            .nodes
            .iter()
            .flat_map(|node| {
                node.children.values().map(move |edge| {
                    (
                        node.position.clone(),
                        edge.notation.clone(),
                        self.nodes[edge.child.index()].position.clone(),
                        edge.count,
                    )
                })
            })
            .collect();
        edges.sort();
        edges
    }
}

impl PartialEq for Repertoire {
    /// Structural equality: same side, root, and edge list with counts.
    fn eq(&self, other: &Self) -> bool {
        self.side == other.side
            && self.root_node().position == other.root_node().position
            && self.num_nodes() == other.num_nodes()
            && self.structure() == other.structure()
    }
}

impl Eq for Repertoire {}
