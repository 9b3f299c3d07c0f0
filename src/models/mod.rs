//! Request and response models for the admin API
//!
//! DTOs serialized to and from HTTP bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{SetRequest, MAX_KEY_LENGTH};
pub use responses::{
    ClearResponse, ErrorResponse, GetResponse, HealthResponse, RemoveResponse, SetResponse,
    StatsResponse,
};
