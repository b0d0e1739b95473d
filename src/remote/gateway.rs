//! Fallback Gateway
//!
//! Resolves local misses against the remote store and promotes what it finds.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{RemoteError, RemoteStore};
use crate::cache::CacheStore;
use crate::error::CacheError;
use crate::tasks::IngestHandle;

// == Fallback Gateway ==
/// Two-tier read path: local store first, remote store on a miss.
#[derive(Clone)]
pub struct FallbackGateway {
    store: Arc<CacheStore>,
    ingest: IngestHandle,
    remote: Option<Arc<dyn RemoteStore>>,
    /// TTL given to promoted values
    default_ttl: Duration,
    /// Upper bound on a single remote fetch
    remote_timeout: Duration,
}

impl FallbackGateway {
    /// Creates a gateway. With no remote store every local miss is final.
    pub fn new(
        store: Arc<CacheStore>,
        ingest: IngestHandle,
        remote: Option<Arc<dyn RemoteStore>>,
        default_ttl: Duration,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ingest,
            remote,
            default_ttl,
            remote_timeout,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    // == Resolve ==
    /// Looks up `key`, falling back to the remote store on a local miss.
    ///
    /// A local hit returns without touching the remote. A remote hit is queued
    /// for promotion into the store with the default TTL and returned without
    /// waiting for the write. Any remote failure is reported as `None`.
    ///
    /// A write to `key` that lands while the fetch is in flight wins: the
    /// promotion is skipped if the store already holds a live entry. A write
    /// still sitting in the queue at that point is not seen, so the older
    /// remote value can be applied after it (last writer wins).
    pub async fn resolve(&self, key: &str) -> Option<Arc<[u8]>> {
        if let Some(value) = self.store.get(key) {
            return Some(value);
        }

        let remote = self.remote.as_ref()?;

        match self.fetch(remote.as_ref(), key).await {
            Ok(value) => {
                let value: Arc<[u8]> = value.into();
                self.promote(key, Arc::clone(&value));
                Some(value)
            }
            Err(RemoteError::NotFound(_)) => {
                debug!("Fallback miss for '{}': not in remote store", key);
                None
            }
            Err(err) => {
                warn!("Fallback miss for '{}': {}", key, err);
                None
            }
        }
    }

    async fn fetch(&self, remote: &dyn RemoteStore, key: &str) -> Result<Vec<u8>, RemoteError> {
        tokio::time::timeout(self.remote_timeout, remote.fetch_remote(key))
            .await
            .map_err(|_| RemoteError::Timeout(self.remote_timeout))?
    }

    fn promote(&self, key: &str, value: Arc<[u8]>) {
        if self.store.contains_key(key) {
            debug!("Promotion of '{}' skipped: written locally during fetch", key);
            return;
        }

        match self.ingest.submit(key, value, self.default_ttl) {
            Ok(()) => debug!("Promoted '{}' from remote store", key),
            Err(CacheError::QueueFull(capacity)) => warn!(
                "Promotion of '{}' dropped: ingestion queue full ({} pending)",
                key, capacity
            ),
            Err(err) => warn!("Promotion of '{}' dropped: {}", key, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::spawn_ingestor;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::watch;

    const TTL: Duration = Duration::from_secs(60);
    const TIMEOUT: Duration = Duration::from_millis(500);

    /// In-memory remote that counts how often it is asked.
    #[derive(Default)]
    struct CountingRemote {
        values: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl CountingRemote {
        fn with(key: &str, value: &[u8]) -> Self {
            let mut values = HashMap::new();
            values.insert(key.to_string(), value.to_vec());
            Self {
                values,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteStore for CountingRemote {
        async fn fetch_remote(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.values
                .get(key)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(key.to_string()))
        }
    }

    struct SlowRemote;

    #[async_trait]
    impl RemoteStore for SlowRemote {
        async fn fetch_remote(&self, _key: &str) -> Result<Vec<u8>, RemoteError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(b"too late".to_vec())
        }
    }

    /// Remote whose fetch races a local write of the same key.
    struct RacingRemote {
        store: Arc<CacheStore>,
    }

    #[async_trait]
    impl RemoteStore for RacingRemote {
        async fn fetch_remote(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
            self.store.put(key, b"fresh".to_vec(), TTL);
            Ok(b"stale".to_vec())
        }
    }

    fn gateway(
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> (FallbackGateway, Arc<CacheStore>, IngestHandle, watch::Sender<bool>) {
        let store = Arc::new(CacheStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ingest, _consumer) = spawn_ingestor(store.clone(), Some(16), shutdown_rx);
        let gateway = FallbackGateway::new(store.clone(), ingest.clone(), remote, TTL, TIMEOUT);
        (gateway, store, ingest, shutdown_tx)
    }

    #[tokio::test]
    async fn test_local_hit_skips_remote() {
        let remote = Arc::new(CountingRemote::with("k", b"remote"));
        let (gateway, store, _ingest, _tx) = gateway(Some(remote.clone()));

        store.put("k", b"local".to_vec(), TTL);

        assert_eq!(&*gateway.resolve("k").await.unwrap(), b"local");
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_hit_is_promoted() {
        let remote = Arc::new(CountingRemote::with("k", b"remote-value"));
        let (gateway, store, ingest, _tx) = gateway(Some(remote.clone()));

        assert_eq!(&*gateway.resolve("k").await.unwrap(), b"remote-value");
        ingest.flush().await.unwrap();

        let promoted = store.snapshot();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].ttl(), TTL);

        assert_eq!(&*gateway.resolve("k").await.unwrap(), b"remote-value");
        assert_eq!(remote.calls(), 1);

        // One local miss, then one local hit.
        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_local_write_during_fetch_is_not_overwritten() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ingest, _consumer) = spawn_ingestor(store.clone(), Some(16), shutdown_rx);
        let remote = Arc::new(RacingRemote {
            store: store.clone(),
        });
        let gateway = FallbackGateway::new(store.clone(), ingest.clone(), Some(remote), TTL, TIMEOUT);

        // The caller still gets what the remote returned.
        assert_eq!(&*gateway.resolve("k").await.unwrap(), b"stale");
        ingest.flush().await.unwrap();

        assert_eq!(store.get("k").as_deref(), Some(&b"fresh"[..]));
    }

    #[tokio::test]
    async fn test_remote_not_found_creates_nothing() {
        let remote = Arc::new(CountingRemote::default());
        let (gateway, store, ingest, _tx) = gateway(Some(remote.clone()));

        assert!(gateway.resolve("missing").await.is_none());
        ingest.flush().await.unwrap();

        assert!(store.is_empty());
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_is_a_miss() {
        let (gateway, store, ingest, _tx) = gateway(Some(Arc::new(SlowRemote)));

        assert!(gateway.resolve("k").await.is_none());
        ingest.flush().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_no_remote_is_a_plain_miss() {
        let (gateway, store, _ingest, _tx) = gateway(None);

        assert!(!gateway.has_remote());
        assert!(gateway.resolve("k").await.is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_promotion_failure_still_returns_value() {
        let remote = Arc::new(CountingRemote::with("k", b"v"));
        let (gateway, store, _ingest, shutdown_tx) = gateway(Some(remote));

        shutdown_tx.send(true).unwrap();
        tokio::task::yield_now().await;

        assert_eq!(&*gateway.resolve("k").await.unwrap(), b"v");
        assert!(store.is_empty());
    }
}
