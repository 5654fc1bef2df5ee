// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Served site: where files come from and what to fall back to
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Document root; without one every request goes to the terminal 404
    #[serde(default)]
    pub root: Option<String>,
    /// Fallback paths tried in order when the requested file is missing
    #[serde(default = "default_try_files")]
    pub try_files: Vec<String>,
    #[serde(default)]
    pub strip_prefix: Option<String>,
    #[serde(default)]
    pub strip_suffix: Option<String>,
    /// Shadow sinks created ahead of the first request
    #[serde(default = "default_pool_warm_up")]
    pub pool_warm_up: usize,
}

fn default_try_files() -> Vec<String> {
    vec!["/index.html".to_string()]
}

const fn default_pool_warm_up() -> usize {
    64
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: None,
            try_files: default_try_files(),
            strip_prefix: None,
            strip_suffix: None,
            pool_warm_up: default_pool_warm_up(),
        }
    }
}
