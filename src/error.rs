//! Error types for the request cache
//!
//! `FetchError` is what every caller attached to a fetch observes, so it must be
//! cheap to clone. `ApiError` is the HTTP-facing error for the proxy server.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Error Enum ==
/// Outcome of a failed `RequestCache::get`.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The fetcher itself failed; the original error is passed through untouched.
    #[error("{0}")]
    Failed(Arc<anyhow::Error>),

    /// The fetcher did not settle within the configured fetch timeout.
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The fetcher panicked instead of returning an error.
    #[error("Fetcher panicked: {0}")]
    Panicked(String),

    /// The key holds a value of a different type than the caller asked for.
    #[error("Cached value for key '{0}' has a different type")]
    TypeMismatch(String),

    /// Normalized form of failures that carried no usable error value.
    #[error("Unknown error")]
    Unknown,
}

impl FetchError {
    /// Wraps any fetcher error.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        FetchError::Failed(Arc::new(err.into()))
    }

    /// Returns the wrapped fetcher error, if this is a pass-through failure.
    pub fn source_error(&self) -> Option<&anyhow::Error> {
        match self {
            FetchError::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

// == Api Error Enum ==
/// Error type for the HTTP proxy and admin endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No upstream is configured for read-through requests
    #[error("No upstream configured")]
    UpstreamUnavailable,

    /// The upstream fetch failed
    #[error("Upstream fetch failed: {0}")]
    Upstream(#[from] FetchError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, ApiError>;
