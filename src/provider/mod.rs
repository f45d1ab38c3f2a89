//! Collaborator seams.
//!
//! Engine analysis and move statistics come from outside the engine and may
//! run concurrently on their own schedules. Their results only ever reach a
//! [`Repertoire`](crate::graph::Repertoire) as ordinary lines through the
//! serialized writer (feature `async`) or a direct `ingest` call.

pub mod cache;
pub mod memory;

#[cfg(feature = "async")]
pub mod writer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::{GraphError, LineRequest};
use crate::types::{NodeMetadata, Position};

pub use cache::{CacheStats, CachingAnalysisProvider};
pub use memory::InMemoryProvider;

#[cfg(feature = "async")]
pub use writer::{RepertoireWriter, WriterHandle};

/// Tag recording where a line came from.
pub const TAG_SOURCE: &str = "Source";

/// Error from a collaborator or the writer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The collaborator could not answer.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    /// The collaborator answered with something unusable.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
    /// No node exists at the requested path.
    #[error("No node after path '{0}'")]
    UnknownPath(String),
    /// The writer task has stopped.
    #[error("Repertoire writer closed")]
    WriterClosed,
    /// Ingesting a provider line failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A move suggested by engine analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Move in SAN or coordinate form.
    pub notation: String,
    /// Evaluation in centipawns from the mover's point of view.
    pub score_cp: Option<i32>,
    /// Search depth the score came from.
    pub depth: u32,
}

/// A move observed in historical games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedMove {
    /// Move in SAN or coordinate form.
    pub notation: String,
    /// Share of games at the position that played it (0.0-1.0).
    pub share: f64,
    /// Games that played it.
    pub games: u64,
}

/// Ranked engine candidates for a position.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Evaluate `position`, best candidate first.
    async fn evaluate(&self, position: &Position) -> Result<Vec<Candidate>, ProviderError>;
}

/// Ranked human moves for a position.
#[async_trait]
pub trait StatisticsProvider: Send + Sync {
    /// Most played moves at `position`, most played first, until their
    /// cumulative share reaches `coverage`.
    async fn top_moves(
        &self,
        position: &Position,
        coverage: f64,
    ) -> Result<Vec<ObservedMove>, ProviderError>;
}

/// `path + candidate` lines for at most `limit` candidates.
pub fn analysis_lines(path: &[String], candidates: &[Candidate], limit: usize) -> Vec<LineRequest> {
    candidates
        .iter()
        .take(limit)
        .map(|candidate| {
            let mut moves = path.to_vec();
            moves.push(candidate.notation.clone());
            LineRequest {
                moves,
                tags: NodeMetadata::new().with(TAG_SOURCE, "analysis"),
            }
        })
        .collect()
}

/// `path + move` lines for observed moves, recording each move's game count
/// as the terminal node's reach count.
pub fn statistics_lines(path: &[String], observed: &[ObservedMove]) -> Vec<LineRequest> {
    observed
        .iter()
        .map(|mv| {
            let mut moves = path.to_vec();
            moves.push(mv.notation.clone());
            let mut tags = NodeMetadata::new().with(TAG_SOURCE, "statistics");
            tags.set_games_reached(mv.games);
            LineRequest { moves, tags }
        })
        .collect()
}

/// Keep the leading moves whose cumulative share first reaches `coverage`.
pub fn cover(observed: Vec<ObservedMove>, coverage: f64) -> Vec<ObservedMove> {
    let mut total = 0.0;
    let mut kept = Vec::new();
    for mv in observed {
        if total >= coverage {
            break;
        }
        total += mv.share;
        kept.push(mv);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(notation: &str, share: f64, games: u64) -> ObservedMove {
        ObservedMove {
            notation: notation.to_string(),
            share,
            games,
        }
    }

    #[test]
    fn test_cover_stops_at_threshold() {
        let moves = vec![observed("e5", 0.5, 50), observed("c5", 0.3, 30), observed("e6", 0.2, 20)];
        let kept = cover(moves.clone(), 0.75);
        assert_eq!(kept.len(), 2);
        assert_eq!(cover(moves.clone(), 0.0).len(), 0);
        assert_eq!(cover(moves, 1.0).len(), 3);
    }

    #[test]
    fn test_statistics_lines_carry_reach_counts() {
        let path = vec!["e4".to_string()];
        let lines = statistics_lines(&path, &[observed("c5", 0.4, 1200)]);
        assert_eq!(lines[0].moves, vec!["e4", "c5"]);
        assert_eq!(lines[0].tags.games_reached(), Some(1200));
        assert_eq!(lines[0].tags.get(TAG_SOURCE), Some("statistics"));
    }

    #[test]
    fn test_analysis_lines_respect_limit() {
        let candidates: Vec<Candidate> = ["Nf3", "d4", "c4"]
            .iter()
            .map(|n| Candidate {
                notation: n.to_string(),
                score_cp: Some(20),
                depth: 18,
            })
            .collect();
        let lines = analysis_lines(&[], &candidates, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].moves, vec!["d4"]);
    }
}
