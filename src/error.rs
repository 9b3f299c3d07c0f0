//! Error types
//!
//! Query failures published by runners, and admin API errors.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Query Error ==
/// Failure published by a [`QueryRunner`](crate::query::QueryRunner).
///
/// Cloneable so it can live in the published state and be handed to the
/// error callback at the same time.
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// The producer rejected. Its contents are not inspected.
    #[error("producer failed on attempt {attempt}: {source}")]
    ProducerFailure {
        /// Retry attempt counter at the time of failure, 0 for the first call
        attempt: u32,
        source: Arc<dyn StdError + Send + Sync>,
    },
}

impl QueryError {
    pub fn producer_failure(attempt: u32, err: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = err.into();
        QueryError::ProducerFailure {
            attempt,
            source: Arc::from(boxed),
        }
    }

    pub fn attempt(&self) -> u32 {
        match self {
            QueryError::ProducerFailure { attempt, .. } => *attempt,
        }
    }
}

// == API Error ==
/// Errors returned by the admin HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Malformed request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Result type for the admin API.
pub type Result<T> = std::result::Result<T, ApiError>;
