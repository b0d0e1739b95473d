//! Tiered Cache
//!
//! Wires the store, the expiration sweeper, the ingestion path and the
//! fallback gateway into one cache instance with a single shutdown signal.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::remote::{FallbackGateway, RemoteStore};
use crate::tasks::{spawn_ingestor, spawn_sweeper, IngestHandle};

// == Tiered Cache ==
/// A time-bounded byte cache with an optional remote tier behind it.
///
/// Reads are served from memory; on a miss the remote store is consulted and
/// any value it returns is promoted into memory. Writes go through a single
/// ordered queue. Expired entries are never served and are reclaimed in the
/// background.
///
/// Each instance owns its own store, counters and background tasks.
///
/// # Example
/// ```rust,no_run
/// use std::time::Duration;
/// use tiercache::{CacheConfig, TieredCache};
///
/// #[tokio::main]
/// async fn main() {
///     let cache = TieredCache::new(CacheConfig::default());
///
///     cache.put("user:1", b"alice".to_vec(), Duration::from_secs(30)).await.unwrap();
///     assert_eq!(cache.get("user:1").await.as_deref(), Some(&b"alice"[..]));
///
///     cache.shutdown().await;
/// }
/// ```
pub struct TieredCache {
    store: Arc<CacheStore>,
    ingest: IngestHandle,
    gateway: FallbackGateway,
    config: CacheConfig,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TieredCache {
    // == Constructors ==
    /// Creates a cache with no remote tier.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context; the sweeper and
    /// ingestion consumer are spawned on the current runtime.
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a cache that falls back to `remote` on local misses.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_remote(config: CacheConfig, remote: Arc<dyn RemoteStore>) -> Self {
        Self::build(config, Some(remote))
    }

    fn build(config: CacheConfig, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        if tokio::runtime::Handle::try_current().is_err() {
            panic!(
                "tiercache::TieredCache requires a Tokio runtime. \
                 Construct it from within #[tokio::main], #[tokio::test], \
                 or code already running on a Tokio runtime."
            );
        }

        let store = Arc::new(CacheStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = spawn_sweeper(store.clone(), config.sweep_interval, shutdown_rx.clone());
        let (ingest, consumer) =
            spawn_ingestor(store.clone(), config.ingest_capacity, shutdown_rx);

        let gateway = FallbackGateway::new(
            store.clone(),
            ingest.clone(),
            remote,
            config.default_ttl,
            config.remote_timeout,
        );

        info!(
            "Cache started: sweep_interval={:?}, default_ttl={:?}, ingest_capacity={:?}, remote={}",
            config.sweep_interval,
            config.default_ttl,
            config.ingest_capacity,
            gateway.has_remote()
        );

        Self {
            store,
            ingest,
            gateway,
            config,
            shutdown_tx,
            tasks: Mutex::new(vec![sweeper, consumer]),
        }
    }

    // == Put ==
    /// Stores `value` under `key` for `ttl` and waits until it is visible.
    ///
    /// With a bounded queue this waits for room rather than failing.
    pub async fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        ttl: Duration,
    ) -> Result<()> {
        self.ingest.put(key, value, ttl).await
    }

    /// Queues a put without waiting for it; rejects when the queue is full.
    pub fn submit(
        &self,
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        ttl: Duration,
    ) -> Result<()> {
        self.ingest.submit(key, value, ttl)
    }

    // == Get ==
    /// Looks up `key` locally, then in the remote tier if one is configured.
    pub async fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.gateway.resolve(key).await
    }

    // == Remove ==
    /// Invalidates `key`, ordered after every write queued before it.
    pub async fn remove(&self, key: impl Into<String>) -> Result<bool> {
        self.ingest.remove(key).await
    }

    /// Waits until every write queued so far has been applied.
    pub async fn flush(&self) -> Result<()> {
        self.ingest.flush().await
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// True while both background tasks are alive.
    pub fn is_running(&self) -> bool {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        !tasks.is_empty() && tasks.iter().all(|task| !task.is_finished())
    }

    // == Shutdown ==
    /// Stops the sweeper and the ingestion consumer and waits for both.
    ///
    /// Writes still queued are discarded. The store stays readable afterwards.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.drain(..).collect()
        };

        for task in tasks {
            if let Err(err) = task.await {
                warn!("Background task ended abnormally: {}", err);
            }
        }

        info!("Cache shut down");
    }
}

impl Drop for TieredCache {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
