//! Document CRUD with cache-aside acceleration.
//!
//! The store is always authoritative; cache entries are best-effort
//! projections of store state. Cache failures never fail the durable
//! operation: reads degrade to the store, write-side maintenance is
//! logged and dropped.

use super::{AccessOptions, Database};
use crate::Error;
use crate::cache::DocumentCache;
use crate::document::Document;
use crate::store::{ListOptions, ListResult};

impl Database {
    /// Get a document by identifier.
    ///
    /// Consults the cache first (when enabled for this call), falling back
    /// to the store and populating the cache on a miss. The entry's TTL is
    /// refreshed on both the hit and the populate path, so frequently-read
    /// documents survive indefinitely under continuous access.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the document is absent from both cache and
    /// store; translated store errors otherwise.
    pub async fn get(&self, id: &str, options: AccessOptions) -> Result<Document, Error> {
        let cache = self.cache_if(options);

        let mut document = None;
        if let Some(cache) = cache {
            document = self.cache_read(cache, id).await;
        }

        let document = match document {
            Some(document) => document,
            None => {
                let document = self.store.get(id).await.map_err(Error::from)?;
                if let Some(cache) = cache {
                    // Fire-and-forget population; the read already succeeded.
                    match serde_json::to_string(&document) {
                        Ok(raw) => {
                            if let Err(err) = cache.set(id, &raw).await {
                                tracing::debug!(%err, id, "failed to populate cache");
                            }
                        }
                        Err(err) => tracing::debug!(%err, id, "failed to serialize document for cache"),
                    }
                }
                document
            }
        };

        if let Some(cache) = cache
            && let Err(err) = cache.expire(id, self.config.cache_ttl_secs).await
        {
            tracing::debug!(%err, id, "failed to refresh cache TTL");
        }

        Ok(document)
    }

    /// Save a document to the store.
    ///
    /// The store-assigned revision token is written back onto `document`
    /// and returned. When caching is enabled the cache entry is
    /// overwritten with the new serialization and its TTL refreshed.
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if the document has no identifier;
    /// `Error::Conflict` if its revision token is stale; translated store
    /// errors otherwise.
    pub async fn insert(
        &self,
        document: &mut Document,
        options: AccessOptions,
    ) -> Result<String, Error> {
        let id = document
            .id()
            .ok_or_else(|| Error::Configuration("missing `_id` for document".into()))?
            .to_string();

        let rev = self.store.insert(document).await.map_err(Error::from)?;
        document.set_rev(rev.clone());

        if let Some(cache) = self.cache_if(options) {
            self.cache_write(cache, &id, document).await;
        }
        Ok(rev)
    }

    /// Permanently remove a document from the store.
    ///
    /// Requires both identifier and current revision token. On success the
    /// in-memory document's revision is cleared, signalling that it is no
    /// longer persisted, and the cache entry is invalidated.
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if identifier or revision is missing;
    /// translated store errors otherwise.
    pub async fn destroy(
        &self,
        document: &mut Document,
        options: AccessOptions,
    ) -> Result<(), Error> {
        let id = document
            .id()
            .ok_or_else(|| Error::Configuration("missing `_id` for document".into()))?
            .to_string();
        let rev = document
            .rev()
            .ok_or_else(|| Error::Configuration("missing `_rev` for document".into()))?
            .to_string();

        self.store.destroy(&id, &rev).await.map_err(Error::from)?;
        document.clear_rev();

        if let Some(cache) = self.cache_if(options)
            && let Err(err) = cache.delete(&id).await
        {
            tracing::warn!(%err, id, "failed to invalidate cache after destroy");
        }
        Ok(())
    }

    /// List documents. Pass-through to the store; never cached.
    pub async fn list(&self, options: &ListOptions) -> Result<ListResult, Error> {
        self.store.list(options).await.map_err(Error::from)
    }

    /// Attempt a cache read, degrading every failure to a miss.
    async fn cache_read(&self, cache: &dyn DocumentCache, id: &str) -> Option<Document> {
        match cache.get(id).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(document) => {
                    self.metrics.record_hit();
                    Some(document)
                }
                Err(err) => {
                    self.metrics.record_miss();
                    tracing::warn!(%err, id, "undecodable cache entry");
                    self.drop_poisoned(cache, id).await;
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_miss();
                tracing::debug!(id, "cache miss");
                None
            }
            Err(err) => {
                self.metrics.record_miss();
                tracing::warn!(%err, id, "cache read failed; falling back to store");
                self.drop_poisoned(cache, id).await;
                None
            }
        }
    }

    /// Best-effort removal of an entry that failed to read or decode.
    async fn drop_poisoned(&self, cache: &dyn DocumentCache, id: &str) {
        if let Err(err) = cache.delete(id).await {
            tracing::warn!(%err, id, "failed to delete broken cache entry");
        }
    }

    /// Overwrite the cache entry after a successful durable write.
    async fn cache_write(&self, cache: &dyn DocumentCache, id: &str, document: &Document) {
        let raw = match serde_json::to_string(document) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(%err, id, "failed to serialize document for cache");
                return;
            }
        };
        if let Err(err) = cache.set(id, &raw).await {
            tracing::warn!(%err, id, "failed to update cache after write");
            return;
        }
        if let Err(err) = cache.expire(id, self.config.cache_ttl_secs).await {
            tracing::warn!(%err, id, "failed to refresh cache TTL after write");
        }
    }
}
