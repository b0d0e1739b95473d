//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::config::{CacheConfig, Config};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, EntriesResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::remote::{HttpRemoteStore, RemoteError};
use crate::TieredCache;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache instance
    pub cache: Arc<TieredCache>,
}

impl AppState {
    /// Wraps an existing cache.
    pub fn new(cache: TieredCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Builds the cache described by `config`, with an HTTP remote tier when
    /// `REMOTE_URL` is set.
    pub fn from_config(config: &Config) -> std::result::Result<Self, RemoteError> {
        let cache_config: CacheConfig = config.cache_config();
        let cache = match &config.remote_url {
            Some(url) => {
                let remote = HttpRemoteStore::new(url, cache_config.remote_timeout)?;
                TieredCache::with_remote(cache_config, Arc::new(remote))
            }
            None => TieredCache::new(cache_config),
        };
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair and answers once the write is visible.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.cache.default_ttl());

    state
        .cache
        .put(req.key.clone(), req.value.into_bytes(), ttl)
        .await?;

    Ok(Json(SetResponse::new(req.key, ttl.as_secs())))
}

/// Handler for GET /get/:key
///
/// Serves from memory, falling back to the remote tier on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::from_bytes(key, &value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Invalidates a key. Deleting an absent key is not an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let removed = state.cache.remove(key.clone()).await?;
    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /entries
///
/// Lists a point-in-time snapshot of the stored entries.
pub async fn entries_handler(State(state): State<AppState>) -> Json<EntriesResponse> {
    Json(EntriesResponse::from_snapshot(&state.cache.snapshot()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    if state.cache.is_running() {
        Json(HealthResponse::healthy())
    } else {
        Json(HealthResponse::degraded())
    }
}
