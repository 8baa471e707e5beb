//! Design-document value type.
//!
//! A design document is a named bundle of view definitions published to the
//! store like any other document, but treated as schema rather than data.
//! Instances are validated at construction and never mutated afterwards;
//! reconciliation either confirms no change or publishes a new revision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;
use crate::document::{Document, ID_FIELD};

/// Identifier prefix reserved for design documents.
pub const DESIGN_PREFIX: &str = "_design/";

/// Query language a design document's views are written in.
///
/// The wire values match what CouchDB-compatible stores expect: `query` for
/// declarative index definitions, `javascript` for map/reduce source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    /// Declarative index/query definitions executed by the store planner.
    Query,
    /// Map/reduce views shipped as JavaScript source text.
    #[default]
    Javascript,
}

/// A single view definition.
///
/// View logic is supplied as source text; the executable form only has
/// meaning inside the store's own execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDef {
    /// Map function source.
    pub map: String,
    /// Optional reduce function source or builtin name (`_count`, `_sum`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl ViewDef {
    /// A map-only view.
    pub fn map(source: impl Into<String>) -> Self {
        Self { map: source.into(), reduce: None }
    }

    /// A map/reduce view.
    pub fn map_reduce(map: impl Into<String>, reduce: impl Into<String>) -> Self {
        Self { map: map.into(), reduce: Some(reduce.into()) }
    }
}

/// Caller-supplied template a [`DesignDocument`] is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignTemplate {
    /// View language; defaults to [`QueryLanguage::Javascript`].
    #[serde(default)]
    pub language: QueryLanguage,
    /// Named views. A sorted map keeps the serialized definition stable
    /// under repeated construction.
    #[serde(default)]
    pub views: BTreeMap<String, ViewDef>,
}

impl DesignTemplate {
    /// Create an empty template with the default language.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the view language.
    pub fn with_language(mut self, language: QueryLanguage) -> Self {
        self.language = language;
        self
    }

    /// Add a view definition.
    pub fn with_view(mut self, name: impl Into<String>, view: ViewDef) -> Self {
        self.views.insert(name.into(), view);
        self
    }
}

/// An immutable, validated design document.
#[derive(Debug, Clone)]
pub struct DesignDocument {
    name: String,
    language: QueryLanguage,
    views: BTreeMap<String, ViewDef>,
    document: Document,
}

impl DesignDocument {
    /// Build and validate a design document from a template.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the name is empty, a view name is
    /// empty, or a view has an empty map source.
    pub fn new(name: impl Into<String>, template: DesignTemplate) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Configuration("design document name must not be empty".into()));
        }

        for (view_name, view) in &template.views {
            if view_name.is_empty() {
                return Err(Error::Configuration(format!(
                    "design document \"{name}\" has a view with an empty name"
                )));
            }
            if view.map.is_empty() {
                return Err(Error::Configuration(format!(
                    "view \"{view_name}\" in design document \"{name}\" is missing a map definition"
                )));
            }
        }

        let mut wire = serde_json::to_value(&template)
            .map_err(|e| Error::Configuration(format!("unserializable design template: {e}")))?;
        if let Value::Object(fields) = &mut wire {
            fields.insert(ID_FIELD.into(), Value::String(format!("{DESIGN_PREFIX}{name}")));
        }
        let document = Document::from_value(wire)?;

        Ok(Self { name, language: template.language, views: template.views, document })
    }

    /// Build a design document from an untyped JSON template.
    ///
    /// Unrecognized `language` tags fail validation here, matching the
    /// construction-time contract.
    pub fn from_json(name: impl Into<String>, template: Value) -> Result<Self, Error> {
        let name = name.into();
        let template: DesignTemplate = serde_json::from_value(template)
            .map_err(|e| Error::Configuration(format!("invalid design template for \"{name}\": {e}")))?;
        Self::new(name, template)
    }

    /// The design document's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The reserved store identifier, `_design/{name}`.
    pub fn id(&self) -> &str {
        self.document.id().unwrap_or(&self.name)
    }

    /// The view language.
    pub fn language(&self) -> QueryLanguage {
        self.language
    }

    /// Whether this design document declares the named view.
    pub fn has_view(&self, view: &str) -> bool {
        self.views.contains_key(view)
    }

    /// Names of all declared views.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// The wire document published to the store.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Canonical content fingerprint, excluding identifier and revision.
    pub fn fingerprint(&self) -> String {
        self.document.content_fingerprint()
    }
}
