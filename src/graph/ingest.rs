//! Line ingestion.
//!
//! A line is fully staged before the graph is touched:
//!
//! 1. Resolve every token against a live board and canonicalize each
//!    resulting position
//! 2. Check staged identities against existing nodes (side to move) and
//!    reject lines that would close a cycle
//! 3. Commit: create-or-reuse nodes and bump edge counters
//!
//! Any failure in steps 1-2 leaves the graph exactly as it was.

use serde::{Deserialize, Serialize};
use shakmaty::Position as _;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::canonicalizer;
use crate::notation::{self, ResolvedMove};
use crate::types::{CanonicalPosition, Edge, Node, NodeMetadata, NodeRef, Position};

use super::{GraphError, Repertoire};

/// One line to ingest: notation tokens from the root plus optional tags for
/// the line's final position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// Notation tokens (SAN or coordinate form).
    pub moves: Vec<String>,
    /// Tags merged into the terminal node.
    #[serde(default)]
    pub tags: NodeMetadata,
}

impl LineRequest {
    /// Line from explicit tokens.
    pub fn new<I, S>(moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            moves: moves.into_iter().map(Into::into).collect(),
            tags: NodeMetadata::default(),
        }
    }

    /// Line from PGN-style movetext.
    pub fn from_movetext(text: &str) -> Self {
        Self {
            moves: notation::tokenize_line(text),
            tags: NodeMetadata::default(),
        }
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: NodeMetadata) -> Self {
        self.tags = tags;
        self
    }
}

/// Result of ingesting one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Node at the end of the line.
    pub terminal: NodeRef,
    /// Plies applied.
    pub plies: usize,
    /// Nodes created by this line.
    pub new_nodes: usize,
}

/// What a batch does with a line that fails on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineErrorPolicy {
    /// Record the failure and continue with the next line.
    Skip,
    /// Abort the batch and restore the pre-batch graph.
    Abort,
}

impl LineErrorPolicy {
    /// Parse policy from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

impl Default for LineErrorPolicy {
    fn default() -> Self {
        Self::Skip
    }
}

/// A line skipped by a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// Position of the line in the batch input.
    pub index: usize,
    /// Why it was rejected.
    pub error: GraphError,
}

/// Summary of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Lines committed.
    pub accepted: usize,
    /// Nodes created across the batch.
    pub new_nodes: usize,
    /// Lines skipped under [`LineErrorPolicy::Skip`].
    pub rejected: Vec<RejectedLine>,
}

#[derive(Debug, Clone)]
struct StagedStep {
    resolved: ResolvedMove,
    canonical: CanonicalPosition,
}

impl Repertoire {
    /// Ingest one line of notation tokens from the root.
    pub fn ingest<S: AsRef<str>>(&mut self, moves: &[S]) -> Result<IngestOutcome, GraphError> {
        self.ingest_with_tags(moves, &NodeMetadata::default())
    }

    /// Ingest PGN-style movetext.
    pub fn ingest_movetext(&mut self, text: &str) -> Result<IngestOutcome, GraphError> {
        self.ingest(&notation::tokenize_line(text))
    }

    /// Ingest a [`LineRequest`].
    pub fn ingest_request(&mut self, line: &LineRequest) -> Result<IngestOutcome, GraphError> {
        self.ingest_with_tags(&line.moves, &line.tags)
    }

    /// Ingest one line and merge `tags` into its terminal node.
    ///
    /// An empty line changes nothing and returns the root as terminal.
    pub fn ingest_with_tags<S: AsRef<str>>(
        &mut self,
        moves: &[S],
        tags: &NodeMetadata,
    ) -> Result<IngestOutcome, GraphError> {
        if moves.is_empty() {
            return Ok(IngestOutcome {
                terminal: self.root,
                plies: 0,
                new_nodes: 0,
            });
        }
        let steps = self.stage(moves)?;
        self.check_consistency(&steps)?;
        let outcome = self.commit(steps, tags);
        debug!(
            plies = outcome.plies,
            new_nodes = outcome.new_nodes,
            terminal = %outcome.terminal,
            "line ingested"
        );
        Ok(outcome)
    }

    /// Ingest many lines.
    ///
    /// Consistency errors always abort and restore the graph as it was
    /// before the batch. Line-local errors follow `policy`: `Skip` records
    /// the line and moves on, `Abort` stops at that line and keeps every
    /// line committed before it.
    pub fn ingest_batch<I>(&mut self, lines: I, policy: LineErrorPolicy) -> Result<BatchReport, GraphError>
    where
        I: IntoIterator<Item = LineRequest>,
    {
        let checkpoint = self.clone();
        let mut report = BatchReport::default();

        for (index, line) in lines.into_iter().enumerate() {
            match self.ingest_request(&line) {
                Ok(outcome) => {
                    report.accepted += 1;
                    report.new_nodes += outcome.new_nodes;
                }
                Err(err) if err.is_line_local() && policy == LineErrorPolicy::Skip => {
                    warn!(line = index, error = %err, "line rejected");
                    report.rejected.push(RejectedLine { index, error: err });
                }
                Err(err) if err.is_line_local() => {
                    // The failing line was staged only; earlier lines stay committed.
                    warn!(line = index, error = %err, "batch aborted");
                    return Err(err);
                }
                Err(err) => {
                    warn!(line = index, error = %err, "batch aborted, restoring graph");
                    *self = checkpoint;
                    return Err(err);
                }
            }
        }

        info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            new_nodes = report.new_nodes,
            total_nodes = self.num_nodes(),
            "batch ingested"
        );
        Ok(report)
    }

    fn stage<S: AsRef<str>>(&self, moves: &[S]) -> Result<Vec<StagedStep>, GraphError> {
        let mut board = self.start_board.clone();
        let mut display = self.root_node().display.clone();
        let mut steps = Vec::with_capacity(moves.len());

        for (i, token) in moves.iter().enumerate() {
            let token = token.as_ref();
            let resolved = notation::resolve(&board, token).ok_or_else(|| GraphError::IllegalMove {
                notation: token.to_string(),
                position: display.clone(),
                ply: i + 1,
            })?;
            board.play_unchecked(&resolved.mv);
            let canonical = canonicalizer::canonicalize_board(&board)?;
            display = canonical.display.clone();
            steps.push(StagedStep { resolved, canonical });
        }
        Ok(steps)
    }

    fn check_consistency(&self, steps: &[StagedStep]) -> Result<(), GraphError> {
        let root = self.root_node();
        let mut on_path: HashSet<&Position> = HashSet::new();
        on_path.insert(&root.position);
        let mut parent = Some(self.root);

        for step in steps {
            let identity = &step.canonical.identity;
            if on_path.contains(identity) {
                return Err(GraphError::Cycle {
                    notation: step.resolved.san.clone(),
                    position: identity.clone(),
                });
            }

            let existing = self.index.get(identity).copied();
            if let Some(id) = existing {
                let node = &self.nodes[id.index()];
                if node.side_to_move != step.canonical.side_to_move {
                    error!(
                        position = %identity,
                        recorded = %node.side_to_move,
                        derived = %step.canonical.side_to_move,
                        "identity conflict"
                    );
                    return Err(GraphError::IdentityConflict {
                        position: identity.clone(),
                        recorded: node.side_to_move,
                        derived: step.canonical.side_to_move,
                    });
                }

                // Following an edge that already exists cannot close a cycle;
                // a new edge into an existing node can.
                let edge_exists = parent
                    .and_then(|p| self.nodes[p.index()].children.get(&step.resolved.san))
                    .map(|edge| edge.child == id)
                    .unwrap_or(false);
                if !edge_exists && self.reaches_any(id, &on_path) {
                    return Err(GraphError::Cycle {
                        notation: step.resolved.san.clone(),
                        position: identity.clone(),
                    });
                }
            }

            on_path.insert(identity);
            parent = existing;
        }
        Ok(())
    }

    /// Whether any node reachable from `from` (inclusive) has a position in `targets`.
    fn reaches_any(&self, from: NodeRef, targets: &HashSet<&Position>) -> bool {
        let mut stack = vec![from];
        let mut visited: HashSet<NodeRef> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id.index()];
            if targets.contains(&node.position) {
                return true;
            }
            stack.extend(node.children.values().map(|edge| edge.child));
        }
        false
    }

    fn commit(&mut self, steps: Vec<StagedStep>, tags: &NodeMetadata) -> IngestOutcome {
        let plies = steps.len();
        let mut new_nodes = 0;
        let mut current = self.root;
        self.nodes[current.index()].visits += 1;

        for (i, step) in steps.into_iter().enumerate() {
            let StagedStep { resolved, canonical } = step;
            let child = match self.index.get(&canonical.identity) {
                Some(id) => *id,
                None => {
                    let id = NodeRef::new(self.nodes.len());
                    self.index.insert(canonical.identity.clone(), id);
                    self.nodes.push(Node::new(
                        id,
                        canonical.identity,
                        canonical.display,
                        canonical.side_to_move,
                        (i + 1) as u32,
                    ));
                    new_nodes += 1;
                    id
                }
            };

            let edge = self.nodes[current.index()]
                .children
                .entry(resolved.san.clone())
                .or_insert_with(|| Edge {
                    notation: resolved.san,
                    uci: resolved.uci,
                    fingerprint: resolved.fingerprint,
                    child,
                    count: 0,
                });
            edge.count += 1;

            let child_node = &mut self.nodes[child.index()];
            child_node.parents.insert(current);
            child_node.visits += 1;
            current = child;
        }

        if !tags.is_empty() {
            self.nodes[current.index()].metadata.merge(tags);
        }
        self.lines_ingested += 1;

        IngestOutcome {
            terminal: current,
            plies,
            new_nodes,
        }
    }
}
