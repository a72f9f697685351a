//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - deltaframe.toml (default configuration)
//! - deltaframe.local.toml (git-ignored local overrides)
//! - Environment variables (DELTAFRAME_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # deltaframe.toml
//! [cache]
//! enabled = true
//! ttl_secs = 300
//!
//! [comparison]
//! top_value_count = 5
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! DELTAFRAME_CACHE__ENABLED=false
//! DELTAFRAME_COMPARISON__MAX_INSIGHTS=5
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub comparison: ComparisonConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the best-effort query result cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time-to-live for cached full results, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum cached entries before LRU eviction
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

/// Dataset comparison limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Top values reported per categorical column side
    #[serde(default = "default_top_value_count")]
    pub top_value_count: usize,

    /// Cap on reported new/missing categorical values per column
    #[serde(default = "default_value_diff_limit")]
    pub value_diff_limit: usize,

    /// Cap on generated insight strings
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}
fn default_cache_max_entries() -> usize {
    256
}
fn default_top_value_count() -> usize {
    5
}
fn default_value_diff_limit() -> usize {
    10
}
fn default_max_insights() -> usize {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl EngineConfig {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. deltaframe.toml (base configuration)
    /// 2. deltaframe.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (DELTAFRAME_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("deltaframe.toml"))
            .merge(Toml::file("deltaframe.local.toml"))
            .merge(Env::prefixed("DELTAFRAME_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DELTAFRAME_").split("__"))
            .extract()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        ComparisonConfig {
            top_value_count: default_top_value_count(),
            value_diff_limit: default_value_diff_limit(),
            max_insights: default_max_insights(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
