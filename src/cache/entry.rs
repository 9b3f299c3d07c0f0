//! Cache Entry Module
//!
//! A single stored value stamped with its insertion time.

use std::time::Duration;

// == Cache Entry ==
/// One key/value pair owned by a [`CacheManager`](crate::cache::CacheManager).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Clock reading at insertion
    pub inserted_at: Duration,
    /// Age bound for this entry
    pub max_age: Duration,
    /// Insertion sequence, breaks ties between equal `inserted_at`
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    pub fn new(key: String, value: V, inserted_at: Duration, max_age: Duration, seq: u64) -> Self {
        Self {
            key,
            value,
            inserted_at,
            max_age,
            seq,
        }
    }

    // == Age ==
    /// Time elapsed between insertion and `now`.
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.inserted_at)
    }

    // == Is Expired ==
    /// An entry expires once its age is strictly greater than `max_age`;
    /// at exactly `max_age` it is still served.
    pub fn is_expired(&self, now: Duration) -> bool {
        self.age(now) > self.max_age
    }

    /// Eviction order key: oldest insertion first, then earliest sequence.
    pub(crate) fn eviction_rank(&self) -> (Duration, u64) {
        (self.inserted_at, self.seq)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(ms: u64) -> CacheEntry<&'static str> {
        CacheEntry::new(
            "k".to_string(),
            "v",
            Duration::from_millis(ms),
            Duration::from_millis(100),
            0,
        )
    }

    #[test]
    fn test_entry_age() {
        let entry = entry_at(1_000);
        assert_eq!(entry.age(Duration::from_millis(1_250)), Duration::from_millis(250));
    }

    #[test]
    fn test_entry_age_saturates_before_insertion() {
        let entry = entry_at(1_000);
        assert_eq!(entry.age(Duration::from_millis(10)), Duration::ZERO);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry_at(0);

        assert!(!entry.is_expired(Duration::from_millis(99)));
        assert!(
            !entry.is_expired(Duration::from_millis(100)),
            "Entry at exactly max_age is still fresh"
        );
        assert!(entry.is_expired(Duration::from_millis(101)));
    }

    #[test]
    fn test_eviction_rank_orders_by_time_then_seq() {
        let mut a = entry_at(5);
        let mut b = entry_at(5);
        a.seq = 1;
        b.seq = 2;
        assert!(a.eviction_rank() < b.eviction_rank());
        assert!(entry_at(4).eviction_rank() < a.eviction_rank());
    }
}
