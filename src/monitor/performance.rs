//! Performance Monitor
//!
//! Times producer calls per endpoint and keeps a smoothed response time.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

// == Performance Metrics ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Completed timed calls
    pub api_calls: u64,
    /// Smoothed response time: each sample is averaged with the previous value
    pub api_response_ms: f64,
    /// Duration of the most recent completed call
    pub last_response_ms: f64,
}

#[derive(Debug, Default)]
struct Inner {
    started: HashMap<String, Instant>,
    metrics: PerformanceMetrics,
}

// == Performance Monitor ==
/// Call timing shared by every query runner.
///
/// Timings are keyed by endpoint; starting a call on an endpoint that is
/// already being timed restarts its clock.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    inner: Mutex<Inner>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a call to `endpoint`.
    pub fn start_api_call(&self, endpoint: &str) {
        self.inner
            .lock()
            .started
            .insert(endpoint.to_string(), Instant::now());
    }

    /// Marks the end of a call to `endpoint` and folds it into the metrics.
    ///
    /// Returns `None` when no call to `endpoint` was started.
    pub fn end_api_call(&self, endpoint: &str) -> Option<Duration> {
        let mut inner = self.inner.lock();
        let started = inner.started.remove(endpoint)?;
        let elapsed = started.elapsed();
        let sample = elapsed.as_secs_f64() * 1_000.0;

        let metrics = &mut inner.metrics;
        metrics.api_response_ms = if metrics.api_calls == 0 {
            sample
        } else {
            (metrics.api_response_ms + sample) / 2.0
        };
        metrics.last_response_ms = sample;
        metrics.api_calls += 1;

        Some(elapsed)
    }

    /// Drops the timing for a call that failed, without recording it.
    pub fn abandon_api_call(&self, endpoint: &str) {
        self.inner.lock().started.remove(endpoint);
    }

    /// Number of calls started but not yet ended.
    pub fn pending_calls(&self) -> usize {
        self.inner.lock().started.len()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.inner.lock().metrics.clone()
    }

    /// Logs the current metrics.
    pub fn report_metrics(&self) {
        let metrics = self.metrics();
        info!(
            api_calls = metrics.api_calls,
            api_response_ms = metrics.api_response_ms,
            last_response_ms = metrics.last_response_ms,
            "performance metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timed_call() {
        let monitor = PerformanceMonitor::new();

        monitor.start_api_call("cases");
        assert_eq!(monitor.pending_calls(), 1);
        tokio::time::advance(Duration::from_millis(200)).await;
        let elapsed = monitor.end_api_call("cases");

        assert_eq!(elapsed, Some(Duration::from_millis(200)));
        assert_eq!(monitor.pending_calls(), 0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.api_calls, 1);
        assert_eq!(metrics.api_response_ms, 200.0);
        assert_eq!(metrics.last_response_ms, 200.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_average() {
        let monitor = PerformanceMonitor::new();

        for ms in [100, 300] {
            monitor.start_api_call("documents");
            tokio::time::advance(Duration::from_millis(ms)).await;
            monitor.end_api_call("documents");
        }

        let metrics = monitor.metrics();
        assert_eq!(metrics.api_calls, 2);
        assert_eq!(metrics.api_response_ms, 200.0);
        assert_eq!(metrics.last_response_ms, 300.0);
    }

    #[test]
    fn test_abandoned_call_is_not_recorded() {
        let monitor = PerformanceMonitor::new();
        monitor.start_api_call("cases");
        monitor.abandon_api_call("cases");

        assert_eq!(monitor.pending_calls(), 0);
        assert_eq!(monitor.end_api_call("cases"), None);
        assert_eq!(monitor.metrics().api_calls, 0);
    }

    #[test]
    fn test_end_without_start() {
        let monitor = PerformanceMonitor::new();
        assert_eq!(monitor.end_api_call("timeline"), None);
        assert_eq!(monitor.metrics(), PerformanceMetrics::default());
    }
}
