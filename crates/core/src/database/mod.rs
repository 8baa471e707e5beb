//! The database façade.
//!
//! [`Database`] gives callers a single coherent API for document CRUD and
//! ad-hoc queries. Durable operations are delegated to a
//! [`DocumentStore`]; reads are transparently accelerated through an
//! optional [`DocumentCache`]; design documents are published through a
//! conflict-aware reconciliation protocol.
//!
//! The façade holds no locks across I/O and performs no CPU-bound work.
//! Its only shared mutable state is the design-document registry, which is
//! append-only during normal operation.

mod crud;
mod query;
mod reconcile;

pub use query::DEFAULT_PAGE_SIZE;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::Error;
use crate::cache::{CacheMetrics, DocumentCache};
use crate::config::DatabaseConfig;
use crate::design::DesignDocument;
use crate::error::StatusClass;
use crate::store::DocumentStore;

/// Per-call caching controls for `get`, `insert`, and `destroy`.
#[derive(Debug, Clone, Copy)]
pub struct AccessOptions {
    /// Consult and maintain the cache for this call. Defaults to `true`;
    /// has no effect when the database carries no cache.
    pub cache: bool,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self { cache: true }
    }
}

impl AccessOptions {
    /// Bypass the cache for this call.
    pub fn no_cache() -> Self {
        Self { cache: false }
    }
}

/// Per-call controls for design-document reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Retry the reconciliation once after a revision conflict. Defaults
    /// to `true`; when disabled, any conflict is immediately fatal.
    pub retry_on_conflict: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { retry_on_conflict: true }
    }
}

impl ReconcileOptions {
    /// Fail immediately on any revision conflict.
    pub fn no_retry() -> Self {
        Self { retry_on_conflict: false }
    }
}

/// Façade over a document store with cache-aside acceleration.
pub struct Database {
    name: String,
    store: Arc<dyn DocumentStore>,
    cache: Option<Arc<dyn DocumentCache>>,
    designs: RwLock<HashMap<String, DesignDocument>>,
    metrics: CacheMetrics,
    config: DatabaseConfig,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("cache", &self.cache.is_some())
            .field("metrics", &self.metrics)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Construct a database bound to a store and optional cache, then
    /// drive initialization against the backend.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` if the name is empty or the database is
    ///   absent and cannot be created.
    /// - `Error::Backend` if the backend cannot be reached at all.
    ///
    /// Initialization failure is terminal for the instance; there are no
    /// retries at this layer.
    pub async fn connect(
        name: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        cache: Option<Arc<dyn DocumentCache>>,
        config: DatabaseConfig,
    ) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Configuration(
                "cannot create a database instance without a database name".into(),
            ));
        }

        let database = Self {
            name,
            store,
            cache,
            designs: RwLock::new(HashMap::new()),
            metrics: CacheMetrics::new(),
            config,
        };
        database.initialize().await?;
        Ok(database)
    }

    async fn initialize(&self) -> Result<(), Error> {
        tracing::debug!(db = %self.name, "initializing database");
        match self.store.fetch_metadata().await {
            Ok(meta) => {
                tracing::debug!(db = %self.name, doc_count = meta.doc_count, "database ready");
                Ok(())
            }
            Err(err) if err.status() == StatusClass::NotFound => {
                tracing::warn!(db = %self.name, "database does not exist and will be created");
                self.store.create_database().await.map_err(|err| {
                    tracing::error!(db = %self.name, %err, "database creation failed");
                    Error::Configuration("unable to create database".into())
                })?;
                tracing::info!(db = %self.name, "database created");
                Ok(())
            }
            Err(err) => {
                tracing::error!(db = %self.name, %err, "database metadata fetch failed");
                Err(Error::Backend("unable to connect to database".into()))
            }
        }
    }

    /// The database name this façade is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache hit/miss counters for this instance.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// The configuration this instance was constructed with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Whether a design document with the given name has been reconciled.
    pub async fn has_design(&self, name: &str) -> bool {
        self.designs.read().await.contains_key(name)
    }

    pub(crate) fn cache_if(&self, options: AccessOptions) -> Option<&dyn DocumentCache> {
        if options.cache { self.cache.as_deref() } else { None }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory store and cache doubles used across the façade tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use async_trait::async_trait;

    use crate::cache::DocumentCache;
    use crate::document::Document;
    use crate::error::{CacheError, StoreError};
    use crate::store::{
        DatabaseMeta, DocumentStore, FindQuery, FindResult, ListOptions, ListResult, ListRow,
        ViewOptions, ViewResult,
    };

    /// In-memory document store with revision enforcement and call counters.
    #[derive(Default)]
    pub struct MockStore {
        pub docs: Mutex<HashMap<String, Document>>,
        pub insert_calls: AtomicU64,
        pub get_calls: AtomicU64,
        pub view_calls: AtomicU64,
        /// Number of upcoming insert calls to fail with a conflict.
        pub forced_conflicts: AtomicU64,
        /// Number of upcoming get calls to report not-found regardless of
        /// content, for staging read/write races.
        pub hidden_gets: AtomicU64,
        /// Report the database itself as absent until `create_database`.
        pub database_missing: AtomicBool,
        /// Fail `fetch_metadata` with an unclassified error.
        pub metadata_unreachable: AtomicBool,
        /// Fail `create_database` with an unclassified error.
        pub create_fails: AtomicBool,
        /// Canned response for `find`.
        pub find_response: Mutex<Option<FindResult>>,
        pub find_calls: AtomicU64,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn next_rev(document: &Document) -> String {
            let generation = document
                .rev()
                .and_then(|rev| rev.split('-').next())
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(0);
            format!("{}-{}", generation + 1, &document.content_fingerprint()[..8])
        }
    }

    #[async_trait]
    impl DocumentStore for MockStore {
        async fn fetch_metadata(&self) -> Result<DatabaseMeta, StoreError> {
            if self.metadata_unreachable.load(Ordering::SeqCst) {
                return Err(StoreError::other("connection refused"));
            }
            if self.database_missing.load(Ordering::SeqCst) {
                return Err(StoreError::not_found("database does not exist"));
            }
            let docs = self.docs.lock().unwrap();
            Ok(DatabaseMeta {
                db_name: "mock".into(),
                doc_count: docs.len() as u64,
                doc_del_count: 0,
            })
        }

        async fn create_database(&self) -> Result<(), StoreError> {
            if self.create_fails.load(Ordering::SeqCst) {
                return Err(StoreError::other("insufficient permissions"));
            }
            self.database_missing.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn list(&self, options: &ListOptions) -> Result<ListResult, StoreError> {
            let docs = self.docs.lock().unwrap();
            let mut ids: Vec<&String> = docs.keys().collect();
            ids.sort();
            let rows = ids
                .iter()
                .map(|id| {
                    let doc = &docs[id.as_str()];
                    ListRow {
                        id: (*id).clone(),
                        rev: doc.rev().unwrap_or_default().to_string(),
                        doc: options.include_docs.then(|| doc.clone()),
                    }
                })
                .collect();
            Ok(ListResult { total_rows: docs.len() as u64, rows })
        }

        async fn get(&self, id: &str) -> Result<Document, StoreError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if self.hidden_gets.load(Ordering::SeqCst) > 0 {
                self.hidden_gets.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::not_found(format!("missing document {id}")));
            }
            let docs = self.docs.lock().unwrap();
            docs.get(id)
                .cloned()
                .ok_or_else(|| StoreError::not_found(format!("missing document {id}")))
        }

        async fn insert(&self, document: &Document) -> Result<String, StoreError> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if self.forced_conflicts.load(Ordering::SeqCst) > 0 {
                self.forced_conflicts.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::conflict("document update conflict"));
            }

            let id = document
                .id()
                .ok_or_else(|| StoreError::other("document has no _id"))?
                .to_string();
            let mut docs = self.docs.lock().unwrap();
            let current_rev = docs.get(&id).and_then(|doc| doc.rev().map(String::from));
            if document.rev().map(String::from) != current_rev {
                return Err(StoreError::conflict("document update conflict"));
            }

            let rev = Self::next_rev(document);
            let mut stored = document.clone();
            stored.set_rev(rev.clone());
            docs.insert(id, stored);
            Ok(rev)
        }

        async fn destroy(&self, id: &str, rev: &str) -> Result<(), StoreError> {
            let mut docs = self.docs.lock().unwrap();
            let current = docs
                .get(id)
                .ok_or_else(|| StoreError::not_found(format!("missing document {id}")))?;
            if current.rev() != Some(rev) {
                return Err(StoreError::conflict("document update conflict"));
            }
            docs.remove(id);
            Ok(())
        }

        async fn query_view(
            &self,
            _design: &str,
            _view: &str,
            _options: &ViewOptions,
        ) -> Result<ViewResult, StoreError> {
            self.view_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ViewResult::default())
        }

        async fn find(&self, _query: &FindQuery) -> Result<FindResult, StoreError> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            let canned = self.find_response.lock().unwrap().clone();
            Ok(canned.unwrap_or_default())
        }
    }

    /// Recording in-memory cache.
    #[derive(Default)]
    pub struct MockCache {
        pub entries: Mutex<HashMap<String, String>>,
        pub expire_calls: Mutex<Vec<(String, u64)>>,
        pub delete_calls: Mutex<Vec<String>>,
        /// Fail every read with a transient error.
        pub fail_reads: AtomicBool,
        /// Fail every write with a transient error.
        pub fail_writes: AtomicBool,
    }

    impl MockCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn poison(&self, key: &str, value: &str) {
            self.entries.lock().unwrap().insert(key.into(), value.into());
        }

        pub fn expire_count(&self) -> usize {
            self.expire_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DocumentCache for MockCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(CacheError::new("connection reset"));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::new("connection reset"));
            }
            self.entries.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.delete_calls.lock().unwrap().push(key.into());
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), CacheError> {
            self.expire_calls.lock().unwrap().push((key.into(), ttl_seconds));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockStore;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_connect_requires_name() {
        let store = Arc::new(MockStore::new());
        let result = Database::connect("", store, None, DatabaseConfig::default()).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_creates_missing_database() {
        let store = Arc::new(MockStore::new());
        store.database_missing.store(true, Ordering::SeqCst);

        let database =
            Database::connect("app", store.clone(), None, DatabaseConfig::default()).await.unwrap();
        assert_eq!(database.name(), "app");
        assert!(!store.database_missing.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connect_create_failure_is_fatal() {
        let store = Arc::new(MockStore::new());
        store.database_missing.store(true, Ordering::SeqCst);
        store.create_fails.store(true, Ordering::SeqCst);

        let result = Database::connect("app", store, None, DatabaseConfig::default()).await;
        match result {
            Err(Error::Configuration(message)) => {
                assert!(message.contains("unable to create database"))
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_unreachable_backend_is_fatal() {
        let store = Arc::new(MockStore::new());
        store.metadata_unreachable.store(true, Ordering::SeqCst);

        let result = Database::connect("app", store, None, DatabaseConfig::default()).await;
        match result {
            Err(Error::Backend(message)) => {
                assert!(message.contains("unable to connect to database"))
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }
}
