//! Metrics Report Task
//!
//! Periodically logs cache statistics and producer call timings.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::CacheManager;
use crate::monitor::PerformanceMonitor;

/// Spawns a task that logs cache and performance metrics every
/// `interval_secs` seconds.
///
/// The task never touches cache entries; expiry stays lazy. Abort the
/// returned handle on shutdown.
pub fn spawn_metrics_reporter<V>(
    cache: Arc<CacheManager<V>>,
    monitor: Arc<PerformanceMonitor>,
    interval_secs: u64,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    let period = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting metrics reporter with interval of {:?}", period);

        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let stats = cache.stats();
            info!(
                entries = stats.total_entries,
                hits = stats.hits,
                misses = stats.misses,
                evictions = stats.evictions,
                expirations = stats.expirations,
                hit_rate = stats.hit_rate(),
                "cache metrics"
            );
            monitor.report_metrics();
        }
    })
}
