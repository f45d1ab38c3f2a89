//! In-memory provider for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    cover, AnalysisProvider, Candidate, ObservedMove, ProviderError, StatisticsProvider,
};
use crate::types::Position;

/// Canned analysis and statistics keyed by position identity.
///
/// Unknown positions answer [`ProviderError::Unavailable`].
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    candidates: BTreeMap<Position, Vec<Candidate>>,
    observed: BTreeMap<Position, Vec<ObservedMove>>,
    evaluations: AtomicU64,
}

impl InMemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis answer for `position`.
    pub fn add_candidates(&mut self, position: Position, candidates: Vec<Candidate>) {
        self.candidates.insert(position, candidates);
    }

    /// Set the statistics answer for `position`.
    pub fn add_observed(&mut self, position: Position, observed: Vec<ObservedMove>) {
        self.observed.insert(position, observed);
    }

    /// Number of `evaluate` calls served so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AnalysisProvider for InMemoryProvider {
    async fn evaluate(&self, position: &Position) -> Result<Vec<Candidate>, ProviderError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.candidates
            .get(position)
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable(format!("no analysis for {position}")))
    }
}

#[async_trait]
impl StatisticsProvider for InMemoryProvider {
    async fn top_moves(
        &self,
        position: &Position,
        coverage: f64,
    ) -> Result<Vec<ObservedMove>, ProviderError> {
        let observed = self
            .observed
            .get(position)
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable(format!("no statistics for {position}")))?;
        Ok(cover(observed, coverage))
    }
}
