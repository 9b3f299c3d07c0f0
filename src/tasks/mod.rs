//! Background Tasks Module
//!
//! Periodic tasks run by the server binary.
//!
//! # Tasks
//! - Metrics report: logs cache statistics and call timings

mod report;

pub use report::spawn_metrics_reporter;
