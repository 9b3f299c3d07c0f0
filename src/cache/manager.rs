//! Cache Manager Module
//!
//! Bounded key/value store with insertion-age eviction and lazy expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, TokioClock};

/// Default age bound for entries (5 minutes)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(300_000);

/// Default item bound
pub const DEFAULT_MAX_ITEMS: usize = 100;

// == Cache Options ==
/// Construction options for [`CacheManager`].
///
/// A zero value in either field falls back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub max_age: Duration,
    pub max_items: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl CacheOptions {
    fn normalized(self) -> Self {
        Self {
            max_age: if self.max_age.is_zero() {
                DEFAULT_MAX_AGE
            } else {
                self.max_age
            },
            max_items: if self.max_items == 0 {
                DEFAULT_MAX_ITEMS
            } else {
                self.max_items
            },
        }
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
    stats: CacheStats,
}

// == Cache Manager ==
/// Shared response cache.
///
/// After every `set` the manager holds at most `max_items` entries, and
/// `get` never returns an entry older than its age bound. Stale entries are
/// only dropped when read; there is no background sweep.
///
/// All operations are synchronous and take `&self`, so one manager is
/// normally wrapped in an `Arc` and handed to every consumer.
#[derive(Debug)]
pub struct CacheManager<V> {
    inner: Mutex<Inner<V>>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
    max_items: usize,
}

impl<V> CacheManager<V> {
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

impl<V: Clone> CacheManager<V> {
    // == Constructor ==
    /// Creates a manager timed by a [`TokioClock`].
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, Arc::new(TokioClock::new()))
    }

    /// Creates a manager timed by the given clock.
    pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        let options = options.normalized();
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
                stats: CacheStats::new(),
            }),
            clock,
            max_age: options.max_age,
            max_items: options.max_items,
        }
    }

    // == Set ==
    /// Stores `value` under `key`, stamped with the current time.
    ///
    /// When the cache is full and `key` is new, the entry with the oldest
    /// insertion time is evicted first. Overwriting never evicts.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, self.max_age);
    }

    // == Set With Max Age ==
    /// Like [`set`](Self::set) but with a per-entry age bound.
    ///
    /// The bound is capped at the manager's own `max_age`.
    pub fn set_with_max_age(&self, key: impl Into<String>, value: V, max_age: Duration) {
        self.insert(key.into(), value, max_age.min(self.max_age));
    }

    fn insert(&self, key: String, value: V, max_age: Duration) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_items {
            let oldest = inner
                .entries
                .values()
                .min_by_key(|entry| entry.eviction_rank())
                .map(|entry| entry.key.clone());

            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
                inner.stats.record_eviction();
                debug!(evicted = %oldest, incoming = %key, "cache full, evicted oldest entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;

        let entry = CacheEntry::new(key.clone(), value, now, max_age, seq);
        inner.entries.insert(key, entry);

        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
    }

    // == Get ==
    /// Returns a clone of the stored value, or `None` if absent or stale.
    ///
    /// A stale entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => {
                inner.stats.record_miss();
                None
            }
            Some(true) => {
                inner.entries.remove(key);
                inner.stats.record_expiration();
                let len = inner.entries.len();
                inner.stats.set_total_entries(len);
                debug!(key, "cache entry expired on read");
                None
            }
            Some(false) => {
                inner.stats.record_hit();
                inner.entries.get(key).map(|entry| entry.value.clone())
            }
        }
    }

    // == Remove ==
    /// Deletes `key` if present.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock();
        if inner.entries.remove(key).is_some() {
            let len = inner.entries.len();
            inner.stats.set_total_entries(len);
        }
    }

    // == Clear ==
    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.stats.set_total_entries(0);
    }

    // == Size ==
    /// Number of entries held, including stale ones not yet read.
    pub fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }
}

impl<V: Clone> Default for CacheManager<V> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}
