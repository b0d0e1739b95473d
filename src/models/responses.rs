//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheStats};

/// Response body for the GET operation (GET /get/:key)
///
/// Peer nodes decode this same shape when one node is another's remote tier.
/// They read `encoded`, never `value`, so stored bytes cross the wire intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value as text; non-UTF-8 bytes are replaced
    pub value: String,
    /// The exact stored bytes, base64 (standard alphabet, padded)
    pub encoded: String,
}

impl GetResponse {
    /// Creates a GetResponse from raw stored bytes
    pub fn from_bytes(key: impl Into<String>, value: &[u8]) -> Self {
        Self {
            key: key.into(),
            value: String::from_utf8_lossy(value).into_owned(),
            encoded: STANDARD.encode(value),
        }
    }

    /// Recovers the exact stored bytes from `encoded`.
    pub fn decode_value(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.encoded)
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// TTL applied, in seconds
    pub ttl: u64,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Outcome message
    pub message: String,
    /// The key that was targeted
    pub key: String,
    /// Whether an entry was actually removed
    pub removed: bool,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        let key = key.into();
        let message = if removed {
            format!("Key '{}' deleted successfully", key)
        } else {
            format!("Key '{}' was not present", key)
        };
        Self {
            message,
            key,
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// One row of the entries listing
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub key: String,
    /// Value size in bytes
    pub size: usize,
    /// Remaining lifetime in milliseconds, 0 once expired
    pub ttl_remaining_ms: u64,
}

impl From<&CacheEntry> for EntrySummary {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key().to_string(),
            size: entry.value().len(),
            ttl_remaining_ms: entry.ttl_remaining().as_millis() as u64,
        }
    }
}

/// Response body for the entries endpoint (GET /entries)
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    pub count: usize,
    /// Sorted by key
    pub entries: Vec<EntrySummary>,
}

impl EntriesResponse {
    pub fn from_snapshot(snapshot: &[CacheEntry]) -> Self {
        let mut entries: Vec<EntrySummary> = snapshot.iter().map(EntrySummary::from).collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            count: entries.len(),
            entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status: "healthy", or "degraded" once background tasks stopped
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
