//! Query Options
//!
//! Per-runner configuration: cache key, retry policy and error callback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::QueryError;

/// Called once when a query has failed and exhausted its retries.
pub type ErrorCallback = Arc<dyn Fn(&QueryError) + Send + Sync>;

/// Default number of retries after the first failure
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default backoff base
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

// == Query Options ==
#[derive(Clone)]
pub struct QueryOptions {
    /// Cache slot for this query. Without one the producer runs on every fetch.
    pub cache_key: Option<String>,
    /// Per-entry age bound for results stored by this query. `None` leaves
    /// expiry to the shared cache's `max_age`; a longer value is capped to it.
    pub cache_duration: Option<Duration>,
    /// Retries after the first failed attempt
    pub retry_count: u32,
    /// Base for linear backoff; retry `n` waits `retry_delay * n`
    pub retry_delay: Duration,
    pub on_error: Option<ErrorCallback>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache_key: None,
            cache_duration: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
            on_error: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry policy taken from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry_count: config.query_retry_count,
            retry_delay: Duration::from_millis(config.query_retry_delay_ms),
            ..Self::default()
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = Some(duration);
        self
    }

    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&QueryError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("cache_key", &self.cache_key)
            .field("cache_duration", &self.cache_duration)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
