//! Query Runner
//!
//! Cache-aware fetch loop around a caller-supplied producer, with linear
//! backoff retries and published state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::error::QueryError;
use crate::query::retry::{backoff_delay, RetryHandle};
use crate::query::{QueryContext, QueryOptions, QueryState};

/// Type-erased producer.
pub type Producer<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

const UNCACHED: &str = "<uncached>";

// == Query Runner ==
/// Runs one logical query against a producer.
///
/// A fetch first consults the shared cache when a cache key is configured.
/// On a miss it calls the producer; success is cached and published,
/// failure is published and retried after `retry_delay * attempt` until
/// `retry_count` retries are spent, at which point `on_error` fires once.
///
/// State is published through a `watch` channel; see [`subscribe`](Self::subscribe).
///
/// Dropping the runner (or calling [`dispose`](Self::dispose)) cancels any
/// pending retry. Retries are tokio tasks, so fetches that can fail must
/// run inside a tokio runtime.
///
/// Concurrent `fetch` calls are not coalesced; the last one to finish
/// wins the published fields.
pub struct QueryRunner<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    producer: Producer<T>,
    context: QueryContext<T>,
    options: QueryOptions,
    state: watch::Sender<QueryState<T>>,
    attempt: AtomicU32,
    pending_retry: Mutex<Option<RetryHandle>>,
    started: AtomicBool,
    disposed: AtomicBool,
}

impl<T> QueryRunner<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new<F, Fut>(producer: F, context: &QueryContext<T>, options: QueryOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let producer: Producer<T> = Arc::new(move || producer().boxed());
        let (state, _) = watch::channel(QueryState::default());

        Self {
            inner: Arc::new(Inner {
                producer,
                context: context.clone(),
                options,
                state,
                attempt: AtomicU32::new(0),
                pending_retry: Mutex::new(None),
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    // == Start ==
    /// Runs the first fetch. Later calls are no-ops.
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!(query = self.query_name(), "query already started");
            return;
        }
        self.fetch().await;
    }

    // == Fetch ==
    /// Runs a single attempt. On failure a retry may be scheduled in the
    /// background; this future does not wait for it.
    pub async fn fetch(&self) {
        Arc::clone(&self.inner).run_attempt().await;
    }

    // == Refetch ==
    /// Cancels any pending retry, resets the attempt counter and fetches.
    pub async fn refetch(&self) {
        self.inner.cancel_pending_retry();
        self.inner.attempt.store(0, Ordering::SeqCst);
        self.inner.state.send_modify(|state| state.attempt = 0);
        self.fetch().await;
    }

    // == Invalidate Cache ==
    /// Removes this query's cache entry. No-op without a cache key.
    pub fn invalidate_cache(&self) {
        if let Some(key) = &self.inner.options.cache_key {
            self.inner.context.cache.remove(key);
            debug!(query = %key, "query cache invalidated");
        }
    }

    // == Published State ==
    pub fn state(&self) -> QueryState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.inner.state.subscribe()
    }

    pub fn result(&self) -> Option<T> {
        self.inner.state.borrow().result.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state.borrow().in_flight
    }

    pub fn last_error(&self) -> Option<QueryError> {
        self.inner.state.borrow().last_error.clone()
    }
}

impl<T> QueryRunner<T> {
    pub fn cache_key(&self) -> Option<&str> {
        self.inner.options.cache_key.as_deref()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.inner.pending_retry.lock().is_some()
    }

    // == Dispose ==
    /// Cancels any pending retry and stops further attempts.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.cancel_pending_retry();
            debug!(query = self.query_name(), "query disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn query_name(&self) -> &str {
        self.cache_key().unwrap_or(UNCACHED)
    }
}

impl<T> Drop for QueryRunner<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> Inner<T> {
    fn cancel_pending_retry(&self) {
        let pending = self.pending_retry.lock().take();
        if let Some(pending) = pending {
            pending.cancel();
            self.state.send_modify(|state| state.retry_pending = false);
        }
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn run_attempt(self: Arc<Self>) -> BoxFuture<'static, ()> {
        async move {
            if self.disposed.load(Ordering::SeqCst) {
                debug!("query disposed, skipping fetch");
                return;
            }

            let key = self.options.cache_key.clone();

            if let Some(key) = key.as_deref() {
                if let Some(cached) = self.context.cache.get(key) {
                    debug!(query = key, "served from cache");
                    self.state.send_modify(|state| state.result = Some(cached));
                    return;
                }
                self.context.monitor.start_api_call(key);
            }

            self.state.send_modify(|state| {
                state.in_flight = true;
                state.last_error = None;
            });

            match (self.producer)().await {
                Ok(value) => self.complete(key.as_deref(), value),
                Err(err) => {
                    if let Some(key) = key.as_deref() {
                        self.context.monitor.abandon_api_call(key);
                    }
                    self.fail(err);
                }
            }

            self.state.send_modify(|state| state.in_flight = false);
        }
        .boxed()
    }

    fn complete(&self, key: Option<&str>, value: T) {
        if let Some(key) = key {
            if let Some(elapsed) = self.context.monitor.end_api_call(key) {
                debug!(query = key, elapsed_ms = elapsed.as_millis() as u64, "producer resolved");
            }
            match self.options.cache_duration {
                Some(max_age) => self.context.cache.set_with_max_age(key, value.clone(), max_age),
                None => self.context.cache.set(key, value.clone()),
            }
        }

        self.attempt.store(0, Ordering::SeqCst);
        self.state.send_modify(|state| {
            state.result = Some(value);
            state.attempt = 0;
        });
    }

    fn fail(self: &Arc<Self>, err: anyhow::Error) {
        let attempt = self.attempt.load(Ordering::SeqCst);
        let error = QueryError::producer_failure(attempt, err);
        let query = self.options.cache_key.as_deref().unwrap_or(UNCACHED);

        self.state
            .send_modify(|state| state.last_error = Some(error.clone()));

        if self.disposed.load(Ordering::SeqCst) {
            debug!(query, "query disposed, not retrying: {}", error);
            return;
        }

        if attempt < self.options.retry_count {
            let next = attempt + 1;
            let delay = backoff_delay(self.options.retry_delay, next);
            self.attempt.store(next, Ordering::SeqCst);

            warn!(
                query,
                attempt = next,
                max_retries = self.options.retry_count,
                delay_ms = delay.as_millis() as u64,
                "producer failed, retrying: {}",
                error
            );

            self.state.send_modify(|state| {
                state.attempt = next;
                state.retry_pending = true;
            });
            self.schedule_retry(delay);
        } else {
            error!(
                query,
                attempts = attempt + 1,
                "query failed, retries exhausted: {}",
                error
            );
            if let Some(on_error) = &self.options.on_error {
                on_error(&error);
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, delay: Duration) {
        let weak = Arc::downgrade(self);

        // Held across spawn so the task cannot take its slot before it is filled
        let mut slot = self.pending_retry.lock();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let own = inner.pending_retry.lock().take();
            if let Some(own) = own {
                own.disarm();
            }
            inner.state.send_modify(|state| state.retry_pending = false);
            inner.run_attempt().await;
        });

        if let Some(previous) = slot.replace(RetryHandle::new(task, delay)) {
            previous.cancel();
        }
    }
}
