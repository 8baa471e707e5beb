//! CouchDB-compatible HTTP store adapter.
//!
//! Implements the [`DocumentStore`] capability over the CouchDB REST API:
//!
//! - **Authentication**: HTTP basic auth when credentials are configured.
//! - **Status mapping**: 404 → not-found, 409 → conflict, 410 → gone,
//!   everything else → other. The façade strips the unclassified ones
//!   before they reach callers.
//! - **Identifier encoding**: path segments are percent-encoded, with the
//!   `_design/` and `_local/` prefixes kept as real path separators.

mod response;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use url::Url;

use davenport_core::error::{StatusClass, StoreError};
use davenport_core::store::{
    DatabaseMeta, DocumentStore, FindQuery, FindResult, ListOptions, ListResult, ViewOptions,
    ViewResult,
};
use davenport_core::{DatabaseConfig, Document, Error};

use response::{ErrorBody, WriteResponse};

/// Default base URL for a local CouchDB node.
const DEFAULT_BASE_URL: &str = "http://localhost:5984";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection settings for [`CouchStore`].
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Base URL of the CouchDB node.
    pub url: String,
    /// Basic-auth username.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl From<&DatabaseConfig> for CouchConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.timeout(),
        }
    }
}

/// [`DocumentStore`] implementation speaking the CouchDB REST API.
///
/// Bound to one database at construction; the underlying `reqwest::Client`
/// pools connections and is cheap to clone.
#[derive(Debug, Clone)]
pub struct CouchStore {
    http: reqwest::Client,
    base: Url,
    db: String,
    config: CouchConfig,
}

impl CouchStore {
    /// Create an adapter bound to the given database.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the database name is empty, the
    /// base URL does not parse, or the HTTP client cannot be built.
    pub fn new(db: impl Into<String>, config: CouchConfig) -> Result<Self, Error> {
        let db = db.into();
        if db.is_empty() {
            return Err(Error::Configuration("database name must not be empty".into()));
        }

        let base = Url::parse(&config.url)
            .map_err(|e| Error::Configuration(format!("invalid store URL \"{}\": {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "store URL \"{}\" cannot carry a database path",
                config.url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base, db, config })
    }

    /// Create an adapter from the façade configuration.
    pub fn from_config(db: impl Into<String>, config: &DatabaseConfig) -> Result<Self, Error> {
        Self::new(db, CouchConfig::from(config))
    }

    /// The database this adapter is bound to.
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Build a URL from path segments under the database.
    ///
    /// Each segment is percent-encoded by the URL library, so document
    /// identifiers containing `/` stay a single segment.
    fn db_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        {
            // Infallible: cannot_be_a_base was rejected at construction.
            let mut path = url.path_segments_mut().unwrap_or_else(|_| unreachable!());
            path.pop_if_empty();
            path.push(&self.db);
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    /// URL for a document, honoring the reserved `_design/` and `_local/`
    /// prefixes as real path separators.
    fn doc_url(&self, id: &str) -> Url {
        for prefix in ["_design", "_local"] {
            if let Some(rest) = id.strip_prefix(&format!("{prefix}/")) {
                return self.db_url(&[prefix, rest]);
            }
        }
        self.db_url(&[id])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::other(format!("{operation}: request timeout"))
            } else {
                StoreError::other(format!("{operation}: network error: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(error_from_response(operation, response).await)
    }
}

/// Map an HTTP status onto the store error classification.
fn classify(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        404 => StatusClass::NotFound,
        409 => StatusClass::Conflict,
        410 => StatusClass::Gone,
        _ => StatusClass::Other,
    }
}

async fn error_from_response(operation: &str, response: reqwest::Response) -> StoreError {
    let status = response.status();
    let detail = match response.json::<ErrorBody>().await {
        Ok(body) => format!("{}: {}", body.error, body.reason),
        Err(_) => format!("status {}", status.as_u16()),
    };
    tracing::debug!(operation, status = status.as_u16(), detail = %detail, "store request failed");
    StoreError::new(classify(status), format!("{operation} failed: {detail}"))
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn fetch_metadata(&self) -> Result<DatabaseMeta, StoreError> {
        let response = self.send("fetch metadata", self.http.get(self.db_url(&[]))).await?;
        response
            .json::<DatabaseMeta>()
            .await
            .map_err(|e| StoreError::other(format!("fetch metadata: undecodable response: {e}")))
    }

    async fn create_database(&self) -> Result<(), StoreError> {
        let url = self.db_url(&[]);
        self.send("create database", self.http.put(url)).await?;
        Ok(())
    }

    async fn list(&self, options: &ListOptions) -> Result<ListResult, StoreError> {
        let mut url = self.db_url(&["_all_docs"]);
        {
            let mut query = url.query_pairs_mut();
            if options.include_docs {
                query.append_pair("include_docs", "true");
            }
            if let Some(limit) = options.limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(skip) = options.skip {
                query.append_pair("skip", &skip.to_string());
            }
        }

        let response = self.send("list", self.http.get(url)).await?;
        let all_docs = response
            .json::<response::AllDocsResponse>()
            .await
            .map_err(|e| StoreError::other(format!("list: undecodable response: {e}")))?;
        Ok(all_docs.into())
    }

    async fn get(&self, id: &str) -> Result<Document, StoreError> {
        let response = self.send("get", self.http.get(self.doc_url(id))).await?;
        response
            .json::<Document>()
            .await
            .map_err(|e| StoreError::other(format!("get: undecodable response: {e}")))
    }

    async fn insert(&self, document: &Document) -> Result<String, StoreError> {
        // PUT to the identifier when the caller assigned one, POST for a
        // store-assigned identifier.
        let request = match document.id() {
            Some(id) => self.http.put(self.doc_url(id)),
            None => self.http.post(self.db_url(&[])),
        };

        let response = self.send("insert", request.json(document)).await?;
        let written = response
            .json::<WriteResponse>()
            .await
            .map_err(|e| StoreError::other(format!("insert: undecodable response: {e}")))?;
        tracing::debug!(id = %written.id, rev = %written.rev, "document written");
        Ok(written.rev)
    }

    async fn destroy(&self, id: &str, rev: &str) -> Result<(), StoreError> {
        let mut url = self.doc_url(id);
        url.query_pairs_mut().append_pair("rev", rev);
        self.send("destroy", self.http.delete(url)).await?;
        Ok(())
    }

    async fn query_view(
        &self,
        design: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult, StoreError> {
        let mut url = self.db_url(&["_design", design, "_view", view]);
        {
            let mut query = url.query_pairs_mut();
            // Key parameters are JSON-encoded in the query string.
            if let Some(key) = &options.key {
                query.append_pair("key", &key.to_string());
            }
            if let Some(start_key) = &options.start_key {
                query.append_pair("startkey", &start_key.to_string());
            }
            if let Some(end_key) = &options.end_key {
                query.append_pair("endkey", &end_key.to_string());
            }
            if let Some(limit) = options.limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(skip) = options.skip {
                query.append_pair("skip", &skip.to_string());
            }
            if options.descending {
                query.append_pair("descending", "true");
            }
            if options.include_docs {
                query.append_pair("include_docs", "true");
            }
        }

        let response = self.send("view query", self.http.get(url)).await?;
        response
            .json::<ViewResult>()
            .await
            .map_err(|e| StoreError::other(format!("view query: undecodable response: {e}")))
    }

    async fn find(&self, query: &FindQuery) -> Result<FindResult, StoreError> {
        let url = self.db_url(&["_find"]);
        let response = self.send("find", self.http.post(url).json(query)).await?;
        response
            .json::<FindResult>()
            .await
            .map_err(|e| StoreError::other(format!("find: undecodable response: {e}")))
    }
}
