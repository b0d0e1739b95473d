//! Configuration Module
//!
//! Cache construction parameters, and the server configuration loaded from
//! environment variables.

use std::env;
use std::time::Duration;

// == Cache Config ==
/// Parameters accepted by [`TieredCache`](crate::TieredCache) at construction.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use tiercache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_sweep_interval(Duration::from_millis(250))
///     .with_ingest_capacity(None);
/// assert_eq!(config.ingest_capacity, None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Interval between expiration sweeps (default: 100 ms)
    pub sweep_interval: Duration,
    /// TTL for values promoted from the remote store (default: 60 s)
    pub default_ttl: Duration,
    /// Ingestion queue bound; `None` means unbounded (default: 1024)
    pub ingest_capacity: Option<usize>,
    /// Upper bound on a single remote fetch (default: 2 s)
    pub remote_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(100),
            default_ttl: Duration::from_secs(60),
            ingest_capacity: Some(1024),
            remote_timeout: Duration::from_secs(2),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the ingestion queue bound. `None` makes the queue unbounded, which
    /// never rejects writes but lets memory grow under sustained overload.
    pub fn with_ingest_capacity(mut self, capacity: Option<usize>) -> Self {
        self.ingest_capacity = capacity;
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Default TTL in seconds for promoted values and writes without a TTL
    pub default_ttl: u64,
    /// Expiration sweep interval in milliseconds
    pub sweep_interval_ms: u64,
    /// Ingestion queue bound, 0 = unbounded
    pub ingest_capacity: usize,
    /// Base URL of the remote tier, if any
    pub remote_url: Option<String>,
    /// Remote fetch timeout in milliseconds
    pub remote_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 60)
    /// - `SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 100)
    /// - `INGEST_CAPACITY` - Write queue bound, 0 for unbounded (default: 1024)
    /// - `REMOTE_URL` - Base URL of a peer node to fall back to (default: none)
    /// - `REMOTE_TIMEOUT_MS` - Remote fetch timeout in milliseconds (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            sweep_interval_ms: parse_var("SWEEP_INTERVAL_MS")
                .unwrap_or(defaults.sweep_interval_ms),
            ingest_capacity: parse_var("INGEST_CAPACITY").unwrap_or(defaults.ingest_capacity),
            remote_url: env::var("REMOTE_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            remote_timeout_ms: parse_var("REMOTE_TIMEOUT_MS")
                .unwrap_or(defaults.remote_timeout_ms),
        }
    }

    /// Converts the server settings into cache construction parameters.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_sweep_interval(Duration::from_millis(self.sweep_interval_ms.max(1)))
            .with_default_ttl(Duration::from_secs(self.default_ttl))
            .with_ingest_capacity(match self.ingest_capacity {
                0 => None,
                bound => Some(bound),
            })
            .with_remote_timeout(Duration::from_millis(self.remote_timeout_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: 60,
            sweep_interval_ms: 100,
            ingest_capacity: 1024,
            remote_url: None,
            remote_timeout_ms: 2000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
