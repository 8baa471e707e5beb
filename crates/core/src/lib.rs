//! Core types and façade for davenport.
//!
//! This crate provides:
//! - The [`Database`] façade with cache-aside reads and writes
//! - Capability traits for the document store and cache backends
//! - Design-document values and reconciliation
//! - Unified error taxonomy and configuration structures

pub mod cache;
pub mod config;
pub mod database;
pub mod design;
pub mod document;
pub mod error;
pub mod store;

pub use cache::{CacheMetrics, DocumentCache};
pub use config::{ConfigError, DatabaseConfig};
pub use database::{AccessOptions, Database, ReconcileOptions};
pub use design::{DesignDocument, DesignTemplate, QueryLanguage, ViewDef};
pub use document::Document;
pub use error::{CacheError, Error, StatusClass, StoreError};
pub use store::{
    DocumentStore, FindQuery, FindResult, ListOptions, ListResult, ViewOptions, ViewResult,
};
