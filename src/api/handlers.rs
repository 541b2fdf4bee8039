//! API Handlers
//!
//! HTTP request handlers for the read-through proxy and cache administration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::RequestCache;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    ClearResponse, HealthResponse, InvalidatePatternRequest, InvalidateResponse,
    PatternInvalidateResponse, StatsResponse,
};
use crate::upstream::{HttpUpstream, Upstream};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request cache; clones share one store
    pub cache: RequestCache,
    /// Backend for `/resources`, None disables the proxy
    pub upstream: Option<Arc<dyn Upstream>>,
    /// TTL applied to proxied resources
    pub resource_ttl: Duration,
}

impl AppState {
    /// Creates a new AppState without an upstream.
    pub fn new(cache: RequestCache) -> Self {
        let resource_ttl = cache.config().default_ttl;
        Self {
            cache,
            upstream: None,
            resource_ttl,
        }
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn Upstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let state = Self::new(RequestCache::new(config.cache_config()));
        match &config.upstream_url {
            Some(url) => Ok(state.with_upstream(Arc::new(HttpUpstream::new(url.clone())?))),
            None => Ok(state),
        }
    }
}

/// Handler for GET /resources/*path
///
/// Serves the upstream resource through the cache. Concurrent requests for the
/// same path share one upstream fetch.
pub async fn resource_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>> {
    let path = path.trim_matches('/').to_string();
    if path.is_empty() {
        return Err(ApiError::InvalidRequest("Resource path cannot be empty".to_string()));
    }

    let upstream = state.upstream.clone().ok_or(ApiError::UpstreamUnavailable)?;
    let fetch_path = path.clone();
    let value = state
        .cache
        .get(
            &path,
            move || async move { upstream.fetch(&fetch_path).await },
            Some(state.resource_ttl),
        )
        .await?;

    Ok(Json(value))
}

/// Handler for DELETE /cache/keys/*key
///
/// Always succeeds; invalidating an unknown key is a no-op.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<InvalidateResponse> {
    let key = key.trim_matches('/').to_string();
    state.cache.invalidate(&key).await;
    Json(InvalidateResponse::new(key))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<PatternInvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let removed = state
        .cache
        .invalidate_pattern(&req.pattern)
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid pattern: {}", e)))?;

    Ok(Json(PatternInvalidateResponse::new(req.pattern, removed)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::new())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
