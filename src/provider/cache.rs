//! LRU cache in front of an analysis provider.
//!
//! Evaluations are keyed by position identity, so transposed positions hit
//! the same entry. Reads take the shared lock and `peek` without touching
//! recency; only misses take the write lock.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{AnalysisProvider, Candidate, ProviderError};
use crate::types::Position;

const DEFAULT_CAPACITY: usize = 10_000;

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries.
    pub len: usize,
    /// Maximum capacity.
    pub cap: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups forwarded to the provider.
    pub misses: u64,
}

/// Wraps an [`AnalysisProvider`] with an LRU evaluation cache.
pub struct CachingAnalysisProvider<P> {
    inner: P,
    cache: Arc<RwLock<LruCache<Position, Vec<Candidate>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: AnalysisProvider> CachingAnalysisProvider<P> {
    /// Cache up to `capacity` evaluations (0 falls back to the default).
    pub fn new(inner: P, capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CAPACITY).expect("default capacity is non-zero"));
        Self {
            inner,
            cache: Arc::new(RwLock::new(LruCache::new(size))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            len: cache.len(),
            cap: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached evaluation.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

#[async_trait]
impl<P: AnalysisProvider> AnalysisProvider for CachingAnalysisProvider<P> {
    async fn evaluate(&self, position: &Position) -> Result<Vec<Candidate>, ProviderError> {
        let cached = self.cache.read().peek(position).cloned();
        if let Some(candidates) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(candidates);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let candidates = self.inner.evaluate(position).await?;
        debug!(%position, candidates = candidates.len(), "evaluation cached");
        self.cache.write().put(position.clone(), candidates.clone());
        Ok(candidates)
    }
}
