//! API Module
//!
//! Admin HTTP surface over the shared response cache.
//!
//! # Endpoints
//! - `PUT /cache` - Store a JSON value under a key
//! - `GET /cache/:key` - Read a cached value
//! - `DELETE /cache/:key` - Remove a key
//! - `DELETE /cache` - Remove every key
//! - `GET /stats` - Cache and call-timing metrics
//! - `GET /health` - Health check

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
