//! Document-store capability.
//!
//! [`DocumentStore`] is the interface any concrete backend implements. The
//! façade depends only on this trait; transport, authentication, and
//! connection management belong to the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::StoreError;

/// Metadata describing a database on the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseMeta {
    /// Database name as reported by the backend.
    #[serde(default)]
    pub db_name: String,
    /// Number of live documents.
    #[serde(default)]
    pub doc_count: u64,
    /// Number of deleted documents still holding tombstones.
    #[serde(default)]
    pub doc_del_count: u64,
}

/// Options for listing all documents.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Include full document bodies in the rows.
    pub include_docs: bool,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Number of rows to skip from the start.
    pub skip: Option<u64>,
}

/// One row of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRow {
    /// Document identifier.
    pub id: String,
    /// Current revision token.
    pub rev: String,
    /// Full document, present when requested via `include_docs`.
    pub doc: Option<Document>,
}

/// Result of listing all documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Total number of documents in the database.
    pub total_rows: u64,
    /// Rows in identifier order.
    pub rows: Vec<ListRow>,
}

/// Options for querying a view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewOptions {
    /// Return only rows with exactly this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    /// Return rows starting from this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_key: Option<Value>,
    /// Return rows up to this key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_key: Option<Value>,
    /// Maximum number of rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Number of rows to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Reverse the key order.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub descending: bool,
    /// Include the emitting document in each row.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_docs: bool,
}

/// One row emitted by a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRow {
    /// Identifier of the emitting document, absent for reduced rows.
    pub id: Option<String>,
    /// Emitted key.
    pub key: Value,
    /// Emitted value.
    pub value: Value,
    /// Emitting document, present when requested via `include_docs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Document>,
}

/// Result of a view query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewResult {
    /// Total rows in the view, absent for reduced results.
    #[serde(default)]
    pub total_rows: Option<u64>,
    /// Offset of the first returned row.
    #[serde(default)]
    pub offset: Option<u64>,
    /// Returned rows.
    pub rows: Vec<ViewRow>,
}

/// A declarative find query.
///
/// The façade always requests execution statistics; callers only supply the
/// selector and paging controls.
#[derive(Debug, Clone, Serialize)]
pub struct FindQuery {
    /// Match criteria; must be a non-empty JSON object.
    pub selector: Value,
    /// Restrict returned documents to these fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Sort specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    /// Page size; the store default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Number of matches to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Pagination bookmark from a previous response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    /// Request execution statistics from the store.
    pub execution_stats: bool,
}

impl FindQuery {
    /// Create a query for the given selector.
    pub fn with_selector(selector: Value) -> Self {
        Self {
            selector,
            fields: None,
            sort: None,
            limit: None,
            skip: None,
            bookmark: None,
            execution_stats: false,
        }
    }

    /// Set the page size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort specification.
    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Execution statistics reported by the store for a find query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Index keys examined.
    #[serde(default)]
    pub total_keys_examined: u64,
    /// Documents fetched and examined.
    #[serde(default)]
    pub total_docs_examined: u64,
    /// Results actually returned.
    #[serde(default)]
    pub results_returned: u64,
    /// Execution time in milliseconds.
    #[serde(default)]
    pub execution_time_ms: f64,
}

/// Result of a find query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindResult {
    /// Matching documents.
    pub docs: Vec<Document>,
    /// Pagination bookmark, when the store supports one.
    #[serde(default)]
    pub bookmark: Option<String>,
    /// Non-fatal diagnostic from the store (e.g. an unindexed selector).
    #[serde(default)]
    pub warning: Option<String>,
    /// Execution statistics, present when requested.
    #[serde(default)]
    pub execution_stats: Option<ExecutionStats>,
    /// Continuation for the next page, attached by the façade when the
    /// returned page was full.
    #[serde(skip)]
    pub(crate) next_query: Option<FindQuery>,
}

impl FindResult {
    /// The follow-up query for the next page, if this page was full.
    ///
    /// Lazy by construction: nothing is fetched until the caller feeds the
    /// query back into [`Database::find`](crate::database::Database::find),
    /// which runs the full protocol again.
    pub fn next_page(&self) -> Option<FindQuery> {
        self.next_query.clone()
    }
}

/// Interface to a document-oriented backend.
///
/// Implementations are bound to one database at construction time. Every
/// operation may fail with a [`StoreError`] carrying a status
/// classification of at least not-found, conflict, gone, or other.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch metadata for the bound database.
    async fn fetch_metadata(&self) -> Result<DatabaseMeta, StoreError>;

    /// Create the bound database.
    async fn create_database(&self) -> Result<(), StoreError>;

    /// List documents.
    async fn list(&self, options: &ListOptions) -> Result<ListResult, StoreError>;

    /// Fetch a document by identifier.
    async fn get(&self, id: &str) -> Result<Document, StoreError>;

    /// Insert or update a document, returning the new revision token.
    ///
    /// Updates must carry the currently-held revision; the store rejects
    /// stale tokens with a conflict.
    async fn insert(&self, document: &Document) -> Result<String, StoreError>;

    /// Permanently remove a document.
    async fn destroy(&self, id: &str, rev: &str) -> Result<(), StoreError>;

    /// Query a view declared by a design document.
    async fn query_view(
        &self,
        design: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult, StoreError>;

    /// Run a declarative find query.
    async fn find(&self, query: &FindQuery) -> Result<FindResult, StoreError>;
}
