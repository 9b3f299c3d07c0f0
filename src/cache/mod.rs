//! Cache Module
//!
//! Bounded in-memory response cache with insertion-age eviction and lazy
//! TTL expiry.

mod clock;
mod entry;
mod manager;
mod stats;


// Re-export public types
pub use clock::{Clock, ManualClock, TokioClock};
pub use entry::CacheEntry;
pub use manager::{CacheManager, CacheOptions, DEFAULT_MAX_AGE, DEFAULT_MAX_ITEMS};
pub use stats::CacheStats;
