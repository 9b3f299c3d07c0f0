//! Query Cache - bounded response cache with a retrying query runner
//!
//! A [`CacheManager`] holds producer results with an item bound and an
//! age bound; a [`QueryRunner`] wraps a producer, consults the cache
//! first, retries failures with linear backoff and publishes its state.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod query;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheOptions};
pub use config::Config;
pub use error::QueryError;
pub use monitor::PerformanceMonitor;
pub use query::{QueryContext, QueryOptions, QueryRunner, QueryState};
pub use tasks::spawn_metrics_reporter;
