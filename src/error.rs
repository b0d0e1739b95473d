//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache and its HTTP layer.
///
/// Absence and expiry never show up here inside the cache itself; reads
/// return `Option`. `NotFound` exists for the request layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache or remote store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Ingestion queue is at capacity
    #[error("Ingestion queue full ({0} pending writes)")]
    QueueFull(usize),

    /// Background tasks have stopped
    #[error("Cache is shutting down")]
    ShuttingDown,
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
