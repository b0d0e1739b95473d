//! Cache Store Module
//!
//! The authoritative key -> entry map plus its hit/miss counters.
//!
//! All access goes through one `RwLock`. Concurrent reads share the read side;
//! puts, removals and sweeps take the write side. A read looks up the entry,
//! checks its deadline and bumps exactly one counter without releasing the
//! guard, so a racing sweep can never slip between the check and the count.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::stats::Counters;
use crate::cache::{CacheEntry, CacheStats};

// == Cache Store ==
/// In-memory store with lazy expiry on read.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Hit/miss counters, bumped only by `get`
    counters: Counters,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    // == Put ==
    /// Stores a value under `key` for `ttl`.
    ///
    /// Any existing entry is replaced unconditionally with a fresh one; its old
    /// deadline is discarded.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Arc<[u8]>>, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry::new(key.clone(), value, ttl);
        self.write().insert(key, entry);
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Returns `None` when the key is absent or its entry has expired. Every
    /// call counts exactly one hit or one miss. Expired entries are left for
    /// the sweeper; reads never take the write lock.
    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        let entries = self.read();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.counters.record_hit();
                Some(entry.value_shared())
            }
            _ => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Deletes the key if present. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Removes `key` only if the entry currently stored under it has expired.
    ///
    /// The deadline is re-checked under the write lock, so an entry that was
    /// overwritten after the caller saw an expired one survives.
    pub fn remove_if_expired(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    // == Remove Expired ==
    /// Removes every expired entry and returns how many were removed.
    ///
    /// Collects candidates under the read lock, then deletes them one key at a
    /// time so readers are never shut out for a whole scan.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        expired_keys
            .iter()
            .filter(|key| self.remove_if_expired(key, now))
            .count()
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of every stored entry, expired ones included.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.read().values().cloned().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total_entries = self.len();
        self.counters.snapshot(total_entries)
    }

    /// Checks for a live entry without touching the counters.
    pub fn contains_key(&self, key: &str) -> bool {
        self.read()
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
