//! Integration Tests for QueryRunner
//!
//! Retry timing, cache hit/expiry paths and teardown, driven on paused
//! tokio time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use query_cache::cache::{CacheManager, CacheOptions};
use query_cache::monitor::PerformanceMonitor;
use query_cache::query::QueryPhase;
use query_cache::{QueryContext, QueryError, QueryOptions, QueryRunner};
use tokio::time::Instant;

// == Helper Functions ==

fn context(max_age: Duration) -> QueryContext<String> {
    QueryContext::new(
        Arc::new(CacheManager::new(CacheOptions {
            max_age,
            max_items: 100,
        })),
        Arc::new(PerformanceMonitor::new()),
    )
}

/// Producer that records the elapsed time of every call and always fails.
fn failing_producer(
    origin: Instant,
    calls: Arc<Mutex<Vec<u128>>>,
) -> impl Fn() -> futures::future::Ready<anyhow::Result<String>> + Send + Sync + 'static {
    move || {
        calls.lock().push(origin.elapsed().as_millis());
        futures::future::ready(Err(anyhow::anyhow!("service unavailable")))
    }
}

/// Producer that counts calls and returns "payload-<n>".
fn counting_producer(
    calls: Arc<AtomicUsize>,
) -> impl Fn() -> futures::future::Ready<anyhow::Result<String>> + Send + Sync + 'static {
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        futures::future::ready(Ok(format!("payload-{}", n)))
    }
}

// == Retry Behavior ==

#[tokio::test(start_paused = true)]
async fn test_retries_with_linear_backoff_then_reports_once() {
    let origin = Instant::now();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reported: Arc<Mutex<Vec<QueryError>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();

    let ctx = context(Duration::from_secs(300));
    let runner = QueryRunner::new(
        failing_producer(origin, calls.clone()),
        &ctx,
        QueryOptions::new()
            .with_cache_key("cases")
            .with_retry_count(3)
            .with_retry_delay(Duration::from_millis(1_000))
            .with_on_error(move |err| sink.lock().push(err.clone())),
    );

    runner.start().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(*calls.lock(), vec![0, 1_000, 3_000, 6_000]);

    let reported = reported.lock();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].attempt(), 3);
    assert!(reported[0].to_string().contains("service unavailable"));

    let state = runner.state();
    assert_eq!(state.phase(), QueryPhase::Failed);
    assert!(!state.in_flight);
    assert!(state.result.is_none());
    assert!(!runner.has_pending_retry());
    assert_eq!(ctx.cache.size(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_success_clears_error_and_resets_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let reported = Arc::new(AtomicUsize::new(0));
    let seen = reported.clone();

    let ctx = context(Duration::from_secs(300));
    let runner = QueryRunner::new(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow::anyhow!("timeout"))
                } else {
                    Ok("cases".to_string())
                }
            }
        },
        &ctx,
        QueryOptions::new()
            .with_cache_key("cases")
            .with_on_error(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
    );

    runner.fetch().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(reported.load(Ordering::SeqCst), 0);

    let state = runner.state();
    assert_eq!(state.result.as_deref(), Some("cases"));
    assert!(state.last_error.is_none());
    assert_eq!(state.attempt, 0);
    assert_eq!(state.phase(), QueryPhase::Idle);
    assert_eq!(ctx.cache.get("cases").as_deref(), Some("cases"));
}

#[tokio::test(start_paused = true)]
async fn test_refetch_cancels_pending_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let healthy = Arc::new(AtomicBool::new(false));
    let counter = calls.clone();
    let up = healthy.clone();

    let ctx = context(Duration::from_secs(300));
    let runner = QueryRunner::new(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let ok = up.load(Ordering::SeqCst);
            async move {
                if ok {
                    Ok("ok".to_string())
                } else {
                    Err(anyhow::anyhow!("down"))
                }
            }
        },
        &ctx,
        QueryOptions::new().with_retry_delay(Duration::from_millis(500)),
    );

    runner.fetch().await;
    assert!(runner.has_pending_retry());
    assert_eq!(runner.state().attempt, 1);

    healthy.store(true, Ordering::SeqCst);
    runner.refetch().await;

    assert!(!runner.has_pending_retry());
    assert_eq!(runner.state().attempt, 0);
    assert_eq!(runner.result().as_deref(), Some("ok"));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Cache Paths ==

#[tokio::test(start_paused = true)]
async fn test_refetch_before_expiry_uses_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = context(Duration::from_secs(300));
    let runner = QueryRunner::new(
        counting_producer(calls.clone()),
        &ctx,
        QueryOptions::new().with_cache_key("documents"),
    );

    runner.start().await;
    assert_eq!(runner.result().as_deref(), Some("payload-1"));

    tokio::time::advance(Duration::from_secs(299)).await;
    runner.refetch().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(runner.result().as_deref(), Some("payload-1"));
    assert!(!runner.is_fetching());
}

#[tokio::test(start_paused = true)]
async fn test_refetch_after_expiry_calls_producer_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = context(Duration::from_secs(300));
    let runner = QueryRunner::new(
        counting_producer(calls.clone()),
        &ctx,
        QueryOptions::new().with_cache_key("documents"),
    );

    runner.start().await;
    tokio::time::advance(Duration::from_secs(301)).await;
    runner.refetch().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(runner.result().as_deref(), Some("payload-2"));
    assert_eq!(ctx.cache.get("documents").as_deref(), Some("payload-2"));
    assert_eq!(ctx.cache.stats().expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cache_duration_shortens_entry_lifetime() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = context(Duration::from_secs(300));
    let runner = QueryRunner::new(
        counting_producer(calls.clone()),
        &ctx,
        QueryOptions::new()
            .with_cache_key("timeline")
            .with_cache_duration(Duration::from_secs(10)),
    );

    runner.fetch().await;
    tokio::time::advance(Duration::from_secs(11)).await;
    runner.fetch().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_runners_share_cache_through_context() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = context(Duration::from_secs(300));
    let options = QueryOptions::new().with_cache_key("user:me");

    let first = QueryRunner::new(counting_producer(calls.clone()), &ctx, options.clone());
    let second = QueryRunner::new(counting_producer(calls.clone()), &ctx, options);

    first.fetch().await;
    second.fetch().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.result().as_deref(), Some("payload-1"));

    second.invalidate_cache();
    first.refetch().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == In-flight Publishing ==

#[tokio::test(start_paused = true)]
async fn test_in_flight_published_while_producer_pending() {
    let ctx = context(Duration::from_secs(300));
    let runner = Arc::new(QueryRunner::new(
        || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, anyhow::Error>("slow".to_string())
        },
        &ctx,
        QueryOptions::new().with_cache_key("slow"),
    ));
    let mut rx = runner.subscribe();

    let task = tokio::spawn({
        let runner = runner.clone();
        async move { runner.fetch().await }
    });

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().in_flight);
    assert_eq!(runner.state().phase(), QueryPhase::Fetching);

    task.await.unwrap();

    let state = runner.state();
    assert!(!state.in_flight);
    assert_eq!(state.result.as_deref(), Some("slow"));

    let metrics = ctx.monitor.metrics();
    assert_eq!(metrics.api_calls, 1);
    assert_eq!(metrics.last_response_ms, 500.0);
}
