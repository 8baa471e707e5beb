//! Document value type and canonical content fingerprinting.
//!
//! A document is a JSON object with two reserved fields: `_id` (unique
//! identifier) and `_rev` (opaque, store-assigned revision token). The
//! content fingerprint excludes both reserved fields so that two documents
//! with the same payload compare equal across revisions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::Error;

/// Reserved identifier field.
pub const ID_FIELD: &str = "_id";

/// Reserved revision-token field.
pub const REV_FIELD: &str = "_rev";

/// A uniquely identified, revisioned record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with the given identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.fields.insert(ID_FIELD.into(), Value::String(id.into()));
        doc
    }

    /// Build a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::Configuration(format!(
                "documents must be JSON objects, got {other}"
            ))),
        }
    }

    /// The document identifier, if set.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// The revision token, if the document has been persisted.
    pub fn rev(&self) -> Option<&str> {
        self.fields.get(REV_FIELD).and_then(Value::as_str)
    }

    /// Set the revision token, returning any previous value.
    pub fn set_rev(&mut self, rev: impl Into<String>) -> Option<Value> {
        self.fields.insert(REV_FIELD.into(), Value::String(rev.into()))
    }

    /// Remove the revision token. Used after a destroy to signal that the
    /// in-memory document is no longer persisted.
    pub fn clear_rev(&mut self) -> Option<Value> {
        self.fields.remove(REV_FIELD)
    }

    /// Read a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Write a field, returning any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// Borrow the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the document into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// SHA-256 fingerprint of the canonical serialization, excluding the
    /// reserved `_id` and `_rev` fields.
    ///
    /// Stable across field insertion order; used for change detection
    /// during design-document reconciliation.
    pub fn content_fingerprint(&self) -> String {
        let mut content = self.fields.clone();
        content.remove(ID_FIELD);
        content.remove(REV_FIELD);

        let canonical = canonical_json(&Value::Object(content));
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Serialize a JSON value with object keys sorted recursively.
pub(crate) fn canonical_json(value: &Value) -> String {
    fn sort_keys(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut sorted = Map::new();
                for key in keys {
                    sorted.insert(key.clone(), sort_keys(&map[key]));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
            other => other.clone(),
        }
    }

    sort_keys(value).to_string()
}
