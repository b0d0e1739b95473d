//! Cache Entry Module
//!
//! Defines a single cached value together with its fixed expiry deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Upper bound applied when `created_at + ttl` overflows the clock.
const MAX_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

// == Cache Entry ==
/// One stored key/value pair.
///
/// An entry is immutable once created. Its deadline is computed at birth and
/// never moved: overwriting a key installs a brand-new entry instead.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: String,
    value: Arc<[u8]>,
    created_at: Instant,
    ttl: Duration,
    expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `value` - The bytes to store
    /// * `ttl` - Lifetime of the entry, measured from now
    pub fn new(key: impl Into<String>, value: impl Into<Arc<[u8]>>, ttl: Duration) -> Self {
        Self::with_created_at(key, value, ttl, Instant::now())
    }

    /// Creates a new entry with an explicit creation time.
    pub fn with_created_at(
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        ttl: Duration,
        created_at: Instant,
    ) -> Self {
        let expires_at = created_at
            .checked_add(ttl)
            .unwrap_or_else(|| created_at + MAX_LIFETIME);

        Self {
            key: key.into(),
            value: value.into(),
            created_at,
            ttl,
            expires_at,
        }
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// A shared handle to the stored bytes; cloning it never copies the value.
    pub fn value_shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.value)
    }

    pub fn created(&self) -> Instant {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its deadline, so a zero TTL produces an entry that is never live.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller-supplied instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
