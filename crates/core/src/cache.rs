//! Cache capability and hit/miss accounting.
//!
//! The cache is a pure acceleration layer keyed by document identifier,
//! never the system of record. Implementations may fail transiently; the
//! façade treats every cache failure as non-fatal.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::CacheError;

/// Interface to a key/value acceleration layer.
///
/// Values are serialized documents. Entries expire via [`expire`]
/// deadlines; there is no other eviction at this layer.
///
/// [`expire`]: DocumentCache::expire
#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// Read a value, `None` on miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value, overwriting any existing entry.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Set or refresh the expiry deadline for a key.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), CacheError>;
}

/// Instance-scoped cache hit/miss counters.
///
/// Owned by each [`Database`](crate::database::Database) rather than shared
/// process-wide, so concurrent instances and tests observe isolated counts.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cache hits observed.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses observed.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate in `[0.0, 1.0]`; zero when nothing has been recorded.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}
