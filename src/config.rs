//! Configuration Module
//!
//! Loads cache, query and server settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheOptions;
use crate::query::QueryOptions;

/// Application configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Age bound for cached entries in milliseconds
    pub cache_max_age_ms: u64,
    /// Maximum number of cached entries
    pub cache_max_items: usize,
    /// Retries after the first failed producer call
    pub query_retry_count: u32,
    /// Base delay for linear retry backoff in milliseconds
    pub query_retry_delay_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between metrics reports
    pub metrics_report_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_AGE_MS` - Entry age bound (default: 300000)
    /// - `CACHE_MAX_ITEMS` - Entry count bound (default: 100)
    /// - `QUERY_RETRY_COUNT` - Retries per query (default: 3)
    /// - `QUERY_RETRY_DELAY_MS` - Linear backoff base (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `METRICS_REPORT_INTERVAL` - Metrics log period in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_max_age_ms: env_or("CACHE_MAX_AGE_MS", defaults.cache_max_age_ms),
            cache_max_items: env_or("CACHE_MAX_ITEMS", defaults.cache_max_items),
            query_retry_count: env_or("QUERY_RETRY_COUNT", defaults.query_retry_count),
            query_retry_delay_ms: env_or("QUERY_RETRY_DELAY_MS", defaults.query_retry_delay_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            metrics_report_interval: env_or(
                "METRICS_REPORT_INTERVAL",
                defaults.metrics_report_interval,
            ),
        }
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            max_age: Duration::from_millis(self.cache_max_age_ms),
            max_items: self.cache_max_items,
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::from_config(self)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_age_ms: 300_000,
            cache_max_items: 100,
            query_retry_count: 3,
            query_retry_delay_ms: 1_000,
            server_port: 3000,
            metrics_report_interval: 60,
        }
    }
}
