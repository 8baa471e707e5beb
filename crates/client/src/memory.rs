//! In-process TTL cache adapter.
//!
//! Implements the [`DocumentCache`] capability over a mutex-guarded map
//! with per-key expiry deadlines. Entries expire lazily on read; `expire`
//! sets or refreshes the deadline, matching the set-then-expire protocol
//! the façade drives. Useful as a single-process accelerator and as the
//! cache for integration-style tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use davenport_core::cache::DocumentCache;
use davenport_core::error::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// Absent until `expire` assigns a deadline.
    expires_at: Option<DateTime<Utc>>,
}

fn expired(entry: &Entry, now: DateTime<Utc>) -> bool {
    entry.expires_at.is_some_and(|deadline| deadline <= now)
}

/// A [`DocumentCache`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| !expired(entry, now)).count()
    }

    /// Whether the cache holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if expired(entry, now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), Entry { value: value.to_string(), expires_at: None });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let deadline = Utc::now() + Duration::seconds(ttl_seconds as i64);
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(deadline);
        }
        Ok(())
    }
}
