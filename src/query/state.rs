//! Query State
//!
//! The fields a runner publishes to its subscribers.

use serde::Serialize;

use crate::error::QueryError;

// == Query Phase ==
/// Where a runner sits in `Idle -> Fetching -> (Idle | RetryScheduled | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    Idle,
    Fetching,
    RetryScheduled,
    /// Retries exhausted; `last_error` holds the final failure
    Failed,
}

// == Query State ==
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Latest value, from the producer or the cache
    pub result: Option<T>,
    /// A producer call is outstanding
    pub in_flight: bool,
    /// Most recent failure; cleared when a producer call starts
    pub last_error: Option<QueryError>,
    /// Retries used since the last success or explicit refetch
    pub attempt: u32,
    /// A retry timer is armed
    pub retry_pending: bool,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            result: None,
            in_flight: false,
            last_error: None,
            attempt: 0,
            retry_pending: false,
        }
    }
}

impl<T> QueryState<T> {
    pub fn phase(&self) -> QueryPhase {
        if self.in_flight {
            QueryPhase::Fetching
        } else if self.retry_pending {
            QueryPhase::RetryScheduled
        } else if self.last_error.is_some() {
            QueryPhase::Failed
        } else {
            QueryPhase::Idle
        }
    }
}
