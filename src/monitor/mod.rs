//! Monitoring Module
//!
//! Call timing for producer invocations.

mod performance;

pub use performance::{PerformanceMetrics, PerformanceMonitor};
