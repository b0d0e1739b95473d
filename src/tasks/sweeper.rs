//! Expiration Sweeper
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task sleeps for `interval` between sweeps and stops as soon as the
/// shutdown signal flips to `true` or its sender is dropped, even in the middle
/// of a sleep. Reads re-check expiry on their own, so the store keeps serving
/// correctly if this task ever dies.
///
/// # Arguments
/// * `store` - Shared reference to the cache store
/// * `interval` - Time between sweeps
/// * `shutdown` - Receiver side of the cache's shutdown signal
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::new());
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let sweeper = spawn_sweeper(store.clone(), Duration::from_millis(100), shutdown_rx);
/// // Later, during shutdown:
/// shutdown_tx.send(true).ok();
/// sweeper.await.ok();
/// ```
pub fn spawn_sweeper(
    store: Arc<CacheStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiration sweeper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; sweep only after a full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let removed = store.remove_expired();
                    if removed > 0 {
                        info!("Expiration sweep: removed {} expired entries", removed);
                    } else {
                        debug!("Expiration sweep: no expired entries found");
                    }
                }
            }
        }

        info!("Expiration sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let store = Arc::new(CacheStore::new());
        store.put("expire_soon", b"value".to_vec(), Duration::from_millis(150));

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sweeper(store.clone(), Duration::from_millis(100), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(store.is_empty(), "Expired entry should have been swept");
        assert_eq!(store.stats().requests(), 0, "Sweeping must not count reads");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_preserves_live_entries() {
        let store = Arc::new(CacheStore::new());
        store.put("long_lived", b"value".to_vec(), Duration::from_secs(3600));

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sweeper(store.clone(), Duration::from_millis(100), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(550)).await;

        assert_eq!(&*store.get("long_lived").unwrap(), b"value");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown_signal() {
        let store = Arc::new(CacheStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // A long interval: shutdown must not wait for the next tick.
        let handle = spawn_sweeper(store, Duration::from_secs(3600), shutdown_rx);
        tokio::task::yield_now().await;

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(10), handle)
            .await
            .expect("sweeper should stop promptly")
            .expect("sweeper should not panic");
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_signal_dropped() {
        let store = Arc::new(CacheStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_sweeper(store, Duration::from_secs(3600), shutdown_rx);
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop once the signal is gone")
            .unwrap();
    }
}
