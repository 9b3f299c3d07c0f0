//! Retry scheduling
//!
//! Linear backoff and the cancellable handle for a pending retry.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Delay before retry number `attempt` (1-based): `base * attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

// == Retry Handle ==
/// Owns a scheduled retry task.
///
/// Dropping the handle aborts the task unless it was disarmed first.
#[derive(Debug)]
pub struct RetryHandle {
    task: Option<JoinHandle<()>>,
    delay: Duration,
}

impl RetryHandle {
    pub(crate) fn new(task: JoinHandle<()>, delay: Duration) -> Self {
        Self {
            task: Some(task),
            delay,
        }
    }

    /// The backoff this retry was scheduled with.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Aborts the retry if it has not run yet.
    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Releases the task without aborting it. Called by the retry task on
    /// itself once its timer has fired.
    pub(crate) fn disarm(mut self) {
        self.task.take();
    }
}

impl Drop for RetryHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
