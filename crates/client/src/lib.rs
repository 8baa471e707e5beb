//! Concrete backend adapters for davenport.
//!
//! This crate provides the CouchDB-compatible HTTP store adapter, the
//! in-process TTL cache adapter, and a convenience constructor wiring both
//! into the core façade.

pub mod couch;
pub mod memory;

pub use couch::{CouchConfig, CouchStore};
pub use memory::MemoryCache;

use std::sync::Arc;

use davenport_core::cache::DocumentCache;
use davenport_core::{Database, DatabaseConfig, Error};

/// Connect to a database using the adapters in this crate.
///
/// Builds a [`CouchStore`] from the configuration, attaches a
/// [`MemoryCache`] unless caching is disabled, and drives the façade's
/// initialization against the backend.
///
/// # Errors
///
/// `Error::Configuration` for unusable connection settings, otherwise
/// whatever [`Database::connect`] reports from initialization.
pub async fn connect(db: &str, config: DatabaseConfig) -> Result<Database, Error> {
    let store = Arc::new(CouchStore::from_config(db, &config)?);
    let cache: Option<Arc<dyn DocumentCache>> = if config.cache_enabled {
        Some(Arc::new(MemoryCache::new()))
    } else {
        None
    };
    Database::connect(db, store, cache, config).await
}
