//! tiercache - A time-bounded in-memory byte cache
//!
//! Stores byte values under string keys for a caller-chosen lifetime, serves
//! reads from memory or, on a miss, from a remote store, and reclaims expired
//! entries in the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod tasks;
mod tiered;

pub use api::AppState;
pub use cache::{CacheEntry, CacheStats, CacheStore};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use remote::{FallbackGateway, HttpRemoteStore, RemoteError, RemoteStore};
pub use tiered::TieredCache;
