//! API Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    ClearResponse, GetResponse, HealthResponse, RemoveResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::monitor::PerformanceMonitor;
use crate::query::QueryContext;

/// State shared by all handlers.
///
/// The cache and monitor are the same instances handed to query runners.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager<Value>>,
    pub monitor: Arc<PerformanceMonitor>,
}

impl AppState {
    pub fn new(cache: CacheManager<Value>) -> Self {
        Self {
            cache: Arc::new(cache),
            monitor: Arc::new(PerformanceMonitor::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheManager::new(config.cache_options()))
    }

    /// Context for query runners sharing this state's cache and monitor.
    pub fn query_context(&self) -> QueryContext<Value> {
        QueryContext::new(self.cache.clone(), self.monitor.clone())
    }
}

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    state.cache.set(req.key.clone(), req.value);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(ApiError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
///
/// Succeeds whether or not the key was present.
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<RemoveResponse> {
    state.cache.remove(&key);
    Json(RemoveResponse::new(key))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.size();
    state.cache.clear();
    info!(cleared, "cache cleared");
    Json(ClearResponse { cleared })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();

    Json(StatsResponse::new(
        &stats,
        state.cache.max_items(),
        state.cache.max_age().as_millis() as u64,
        state.monitor.metrics(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
