//! Wire types for CouchDB responses.

use serde::Deserialize;

use davenport_core::Document;
use davenport_core::store::{ListResult, ListRow};

/// CouchDB error body, e.g. `{"error":"conflict","reason":"..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    pub reason: String,
}

/// Response to a document write, e.g. `{"ok":true,"id":"...","rev":"..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct WriteResponse {
    pub id: String,
    pub rev: String,
}

/// Response to `_all_docs`.
#[derive(Debug, Deserialize)]
pub(crate) struct AllDocsResponse {
    pub total_rows: u64,
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllDocsRow {
    pub id: String,
    pub value: RowValue,
    #[serde(default)]
    pub doc: Option<Document>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RowValue {
    pub rev: String,
}

impl From<AllDocsResponse> for ListResult {
    fn from(response: AllDocsResponse) -> Self {
        ListResult {
            total_rows: response.total_rows,
            rows: response
                .rows
                .into_iter()
                .map(|row| ListRow { id: row.id, rev: row.value.rev, doc: row.doc })
                .collect(),
        }
    }
}
