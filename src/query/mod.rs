//! Query Module
//!
//! Cache-aware, retrying fetches around caller-supplied producers.

mod options;
mod retry;
mod runner;
mod state;

use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheManager, CacheOptions};
use crate::monitor::PerformanceMonitor;

pub use options::{ErrorCallback, QueryOptions, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY};
pub use retry::{backoff_delay, RetryHandle};
pub use runner::{Producer, QueryRunner};
pub use state::{QueryPhase, QueryState};

// == Query Context ==
/// Shared collaborators handed to every runner.
///
/// Built once by the composition root; cloning shares the same cache and
/// monitor.
pub struct QueryContext<T> {
    pub cache: Arc<CacheManager<T>>,
    pub monitor: Arc<PerformanceMonitor>,
}

impl<T: Clone> QueryContext<T> {
    pub fn new(cache: Arc<CacheManager<T>>, monitor: Arc<PerformanceMonitor>) -> Self {
        Self { cache, monitor }
    }

    /// Fresh cache and monitor.
    pub fn from_options(options: CacheOptions) -> Self {
        Self::new(
            Arc::new(CacheManager::new(options)),
            Arc::new(PerformanceMonitor::new()),
        )
    }
}

impl<T> Clone for QueryContext<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            monitor: Arc::clone(&self.monitor),
        }
    }
}

impl<T> fmt::Debug for QueryContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("cache_max_items", &self.cache.max_items())
            .field("cache_max_age", &self.cache.max_age())
            .finish()
    }
}
