//! Database configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DAVENPORT_*)
//! 2. TOML config file (if DAVENPORT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Database configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DAVENPORT_*)
/// 2. TOML config file (if DAVENPORT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base URL of the document store.
    ///
    /// Set via DAVENPORT_URL environment variable.
    #[serde(default = "default_url")]
    pub url: String,

    /// Username for basic authentication against the store.
    ///
    /// Set via DAVENPORT_USERNAME environment variable.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication against the store.
    ///
    /// Set via DAVENPORT_PASSWORD environment variable.
    #[serde(default)]
    pub password: Option<String>,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via DAVENPORT_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether to attach a cache at all.
    ///
    /// Set via DAVENPORT_CACHE_ENABLED environment variable. Per-call
    /// opt-out is available separately on each operation.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Time-to-live for cache entries, in seconds.
    ///
    /// Set via DAVENPORT_CACHE_TTL_SECS environment variable. Refreshed on
    /// every read hit and every write; the sole eviction mechanism.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Threshold above which a find query's execution time is reported at
    /// warning level, in milliseconds.
    ///
    /// Set via DAVENPORT_SLOW_QUERY_MS environment variable.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
}

fn default_url() -> String {
    "http://localhost:5984".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_slow_query_ms() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            timeout_ms: default_timeout_ms(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            slow_query_ms: default_slow_query_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Request timeout as a Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DAVENPORT_`
    /// 2. TOML file from `DAVENPORT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DAVENPORT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DAVENPORT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
