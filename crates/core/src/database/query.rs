//! View and find queries.
//!
//! View references are validated against the design-document registry
//! before any I/O. Find queries always request execution statistics and
//! report them through tracing, at warning level past the configured
//! slow-query threshold.

use super::Database;
use crate::Error;
use crate::store::{FindQuery, FindResult, ViewOptions, ViewResult};

/// Page size assumed when a find query does not set an explicit limit;
/// matches the store's own default.
pub const DEFAULT_PAGE_SIZE: u64 = 25;

impl Database {
    /// Query a view declared by a reconciled design document.
    ///
    /// # Errors
    ///
    /// Fails before touching the store with `Error::Configuration` when a
    /// name is empty, or `Error::NotFound` when the design document is not
    /// in the registry or does not declare the view. Store errors are
    /// translated and propagated.
    pub async fn view(
        &self,
        design: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult, Error> {
        if design.is_empty() {
            return Err(Error::Configuration("missing design document name for view query".into()));
        }
        if view.is_empty() {
            return Err(Error::Configuration("missing view name for view query".into()));
        }

        {
            let designs = self.designs.read().await;
            let design_doc = designs.get(design).ok_or_else(|| {
                Error::NotFound(format!("unknown design document \"{design}\""))
            })?;
            if !design_doc.has_view(view) {
                return Err(Error::NotFound(format!(
                    "design document \"{design}\" does not declare view \"{view}\""
                )));
            }
        }

        self.store.query_view(design, view, options).await.map_err(Error::from)
    }

    /// Run a declarative find query.
    ///
    /// Execution statistics are always requested; the store's warning, if
    /// any, is surfaced as a non-fatal diagnostic. When the returned page
    /// is full (document count equals the requested page size, default
    /// 25), the result carries a continuation query for the next page;
    /// see [`FindResult::next_page`].
    ///
    /// # Errors
    ///
    /// `Error::Configuration` when the selector is missing or empty;
    /// translated store errors otherwise.
    pub async fn find(&self, query: FindQuery) -> Result<FindResult, Error> {
        let has_selector = query.selector.as_object().is_some_and(|s| !s.is_empty());
        if !has_selector {
            return Err(Error::Configuration("a selector is required for queries".into()));
        }

        let mut query = query;
        query.execution_stats = true;

        let mut result = self.store.find(&query).await.map_err(Error::from)?;

        if let Some(warning) = &result.warning {
            tracing::warn!(db = %self.name, warning = %warning, "find query warning");
        }

        if let Some(stats) = &result.execution_stats {
            if stats.execution_time_ms > self.config.slow_query_ms as f64 {
                tracing::warn!(
                    db = %self.name,
                    execution_time_ms = stats.execution_time_ms,
                    returned = stats.results_returned,
                    examined = stats.total_docs_examined,
                    "slow find query"
                );
            } else {
                tracing::debug!(
                    db = %self.name,
                    execution_time_ms = stats.execution_time_ms,
                    returned = stats.results_returned,
                    examined = stats.total_docs_examined,
                    "find query completed"
                );
            }
        }

        let page_size = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if result.docs.len() as u64 == page_size {
            let mut next = query;
            next.bookmark = result.bookmark.clone();
            result.next_query = Some(next);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ReconcileOptions;
    use super::super::mock::MockStore;
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::design::{DesignDocument, DesignTemplate, ViewDef};
    use crate::document::Document;
    use crate::store::{ExecutionStats, FindResult};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    async fn database_with_users_design() -> (Database, Arc<MockStore>) {
        let store = Arc::new(MockStore::new());
        let database =
            Database::connect("app", store.clone(), None, DatabaseConfig::default()).await.unwrap();

        let template = DesignTemplate::new().with_view(
            "byEmail",
            ViewDef::map("function (doc) { if (doc.email) emit(doc.email, null); }"),
        );
        let design = DesignDocument::new("users", template).unwrap();
        database.insert_design(&design, ReconcileOptions::default()).await.unwrap();
        (database, store)
    }

    fn full_page(len: usize) -> FindResult {
        let docs = (0..len)
            .map(|i| {
                let mut doc = Document::with_id(format!("users:{i}"));
                doc.set_rev("1-abc");
                doc
            })
            .collect();
        FindResult {
            docs,
            bookmark: Some("g1AAAA".into()),
            warning: None,
            execution_stats: Some(ExecutionStats {
                total_keys_examined: 0,
                total_docs_examined: len as u64 * 2,
                results_returned: len as u64,
                execution_time_ms: 1.5,
            }),
            next_query: None,
        }
    }

    #[tokio::test]
    async fn test_view_requires_names() {
        let (database, store) = database_with_users_design().await;

        let result = database.view("", "byEmail", &ViewOptions::default()).await;
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = database.view("users", "", &ViewOptions::default()).await;
        assert!(matches!(result, Err(Error::Configuration(_))));

        assert_eq!(store.view_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_view_unknown_design_fails_before_store() {
        let (database, store) = database_with_users_design().await;

        let result = database.view("orders", "byTotal", &ViewOptions::default()).await;
        match result {
            Err(Error::NotFound(message)) => assert!(message.contains("orders")),
            other => panic!("expected not-found, got {other:?}"),
        }
        assert_eq!(store.view_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_view_undeclared_view_fails_before_store() {
        let (database, store) = database_with_users_design().await;

        let result = database.view("users", "byName", &ViewOptions::default()).await;
        match result {
            Err(Error::NotFound(message)) => assert!(message.contains("byName")),
            other => panic!("expected not-found, got {other:?}"),
        }
        assert_eq!(store.view_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_view_delegates_to_store() {
        let (database, store) = database_with_users_design().await;

        database.view("users", "byEmail", &ViewOptions::default()).await.unwrap();
        assert_eq!(store.view_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_find_requires_selector() {
        let (database, store) = database_with_users_design().await;

        let result = database.find(FindQuery::with_selector(json!({}))).await;
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = database.find(FindQuery::with_selector(json!(null))).await;
        assert!(matches!(result, Err(Error::Configuration(_))));

        assert_eq!(store.find_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_full_page_attaches_continuation() {
        let (database, store) = database_with_users_design().await;
        *store.find_response.lock().unwrap() = Some(full_page(10));

        let query = FindQuery::with_selector(json!({"type": "user"})).limit(10);
        let result = database.find(query).await.unwrap();

        let next = result.next_page().expect("expected a continuation");
        assert_eq!(next.bookmark.as_deref(), Some("g1AAAA"));
        assert_eq!(next.limit, Some(10));
        assert!(next.execution_stats);
    }

    #[tokio::test]
    async fn test_find_partial_page_has_no_continuation() {
        let (database, store) = database_with_users_design().await;
        *store.find_response.lock().unwrap() = Some(full_page(9));

        let query = FindQuery::with_selector(json!({"type": "user"})).limit(10);
        let result = database.find(query).await.unwrap();
        assert!(result.next_page().is_none());
    }

    #[tokio::test]
    async fn test_find_default_page_size_is_25() {
        let (database, store) = database_with_users_design().await;
        *store.find_response.lock().unwrap() = Some(full_page(25));

        let result =
            database.find(FindQuery::with_selector(json!({"type": "user"}))).await.unwrap();
        assert!(result.next_page().is_some());

        *store.find_response.lock().unwrap() = Some(full_page(24));
        let result =
            database.find(FindQuery::with_selector(json!({"type": "user"}))).await.unwrap();
        assert!(result.next_page().is_none());
    }

    #[tokio::test]
    async fn test_find_continuation_runs_full_protocol() {
        let (database, store) = database_with_users_design().await;
        *store.find_response.lock().unwrap() = Some(full_page(10));

        let query = FindQuery::with_selector(json!({"type": "user"})).limit(10);
        let first = database.find(query).await.unwrap();
        let next = first.next_page().unwrap();

        database.find(next).await.unwrap();
        assert_eq!(store.find_calls.load(Ordering::SeqCst), 2);
    }
}
