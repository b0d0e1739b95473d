//! Ingestion Path
//!
//! Funnels writes from any number of producers through one queue drained by a
//! single consumer task. The consumer applies requests to the store in the
//! order they were enqueued, so puts to the same key land in submission order.
//!
//! The queue is bounded by default. `submit` rejects with
//! [`CacheError::QueueFull`] when it is at capacity; `put` and `flush` wait for
//! room instead. An unbounded queue never rejects, and will grow without limit
//! if producers outpace the consumer for long.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::error::{CacheError, Result};

/// A single unit of work for the consumer.
#[derive(Debug)]
enum IngestRequest {
    Put {
        key: String,
        value: Arc<[u8]>,
        ttl: Duration,
        ack: Option<oneshot::Sender<()>>,
    },
    Remove {
        key: String,
        ack: oneshot::Sender<bool>,
    },
    /// Barrier: answered once every earlier request has been applied.
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
enum QueueSender {
    Bounded(mpsc::Sender<IngestRequest>),
    Unbounded(mpsc::UnboundedSender<IngestRequest>),
}

#[derive(Debug)]
enum QueueReceiver {
    Bounded(mpsc::Receiver<IngestRequest>),
    Unbounded(mpsc::UnboundedReceiver<IngestRequest>),
}

impl QueueReceiver {
    async fn recv(&mut self) -> Option<IngestRequest> {
        match self {
            QueueReceiver::Bounded(rx) => rx.recv().await,
            QueueReceiver::Unbounded(rx) => rx.recv().await,
        }
    }
}

// == Ingest Handle ==
/// Producer side of the ingestion path. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IngestHandle {
    tx: QueueSender,
    capacity: Option<usize>,
}

impl IngestHandle {
    // == Submit ==
    /// Enqueues a put without waiting for it to be applied.
    ///
    /// Fails with `QueueFull` if a bounded queue has no room, or
    /// `ShuttingDown` once the consumer has stopped.
    pub fn submit(
        &self,
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        ttl: Duration,
    ) -> Result<()> {
        let request = IngestRequest::Put {
            key: key.into(),
            value: value.into(),
            ttl,
            ack: None,
        };

        match &self.tx {
            QueueSender::Bounded(tx) => tx.try_send(request).map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    CacheError::QueueFull(self.capacity.unwrap_or_default())
                }
                mpsc::error::TrySendError::Closed(_) => CacheError::ShuttingDown,
            }),
            QueueSender::Unbounded(tx) => tx.send(request).map_err(|_| CacheError::ShuttingDown),
        }
    }

    // == Put ==
    /// Enqueues a put and waits until the store has applied it.
    ///
    /// A read issued after this returns observes this value or a later one.
    pub async fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        ttl: Duration,
    ) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(IngestRequest::Put {
            key: key.into(),
            value: value.into(),
            ttl,
            ack: Some(ack_tx),
        })
        .await?;

        ack_rx.await.map_err(|_| CacheError::ShuttingDown)
    }

    // == Remove ==
    /// Enqueues a removal behind any pending writes and waits for it.
    ///
    /// Returns whether an entry was removed.
    pub async fn remove(&self, key: impl Into<String>) -> Result<bool> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(IngestRequest::Remove {
            key: key.into(),
            ack: ack_tx,
        })
        .await?;

        ack_rx.await.map_err(|_| CacheError::ShuttingDown)
    }

    // == Flush ==
    /// Waits until every request enqueued before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(IngestRequest::Flush(ack_tx)).await?;
        ack_rx.await.map_err(|_| CacheError::ShuttingDown)
    }

    /// Queue bound, or `None` for an unbounded queue.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    async fn enqueue(&self, request: IngestRequest) -> Result<()> {
        match &self.tx {
            QueueSender::Bounded(tx) => tx
                .send(request)
                .await
                .map_err(|_| CacheError::ShuttingDown),
            QueueSender::Unbounded(tx) => tx.send(request).map_err(|_| CacheError::ShuttingDown),
        }
    }
}

/// Spawns the single consumer of the ingestion queue.
///
/// # Arguments
/// * `store` - Store the requests are applied to
/// * `capacity` - Queue bound, `None` for unbounded
/// * `shutdown` - Receiver side of the cache's shutdown signal
///
/// # Returns
/// The producer handle and the consumer's JoinHandle. The consumer exits when
/// shutdown is signalled or every handle has been dropped. Requests still
/// queued at that point are discarded; their waiters see `ShuttingDown`.
pub fn spawn_ingestor(
    store: Arc<CacheStore>,
    capacity: Option<usize>,
    mut shutdown: watch::Receiver<bool>,
) -> (IngestHandle, JoinHandle<()>) {
    let (tx, mut rx) = match capacity {
        Some(bound) => {
            let (tx, rx) = mpsc::channel(bound.max(1));
            (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
        }
    };

    let handle = IngestHandle {
        tx,
        capacity: capacity.map(|bound| bound.max(1)),
    };

    let consumer = tokio::spawn(async move {
        info!("Starting ingestion consumer (capacity: {:?})", capacity);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                request = rx.recv() => match request {
                    Some(request) => apply(&store, request),
                    None => break,
                },
            }
        }

        info!("Ingestion consumer stopped");
    });

    (handle, consumer)
}

fn apply(store: &CacheStore, request: IngestRequest) {
    match request {
        IngestRequest::Put {
            key,
            value,
            ttl,
            ack,
        } => {
            debug!("Ingest: put '{}' ({} bytes, ttl {:?})", key, value.len(), ttl);
            store.put(key, value, ttl);
            if let Some(ack) = ack {
                // The producer may have given up waiting.
                let _ = ack.send(());
            }
        }
        IngestRequest::Remove { key, ack } => {
            let removed = store.remove(&key);
            debug!("Ingest: remove '{}' (present: {})", key, removed);
            let _ = ack.send(removed);
        }
        IngestRequest::Flush(ack) => {
            let _ = ack.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_put_is_applied_before_ack() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, _consumer) = spawn_ingestor(store.clone(), Some(16), shutdown_rx);

        handle.put("key", b"value".to_vec(), TTL).await.unwrap();

        assert_eq!(&*store.get("key").unwrap(), b"value");
    }

    #[tokio::test]
    async fn test_submit_then_flush() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, _consumer) = spawn_ingestor(store.clone(), None, shutdown_rx);

        for i in 0..100 {
            handle.submit(format!("k{}", i), vec![i as u8], TTL).unwrap();
        }
        handle.flush().await.unwrap();

        assert_eq!(store.len(), 100);
    }

    #[tokio::test]
    async fn test_same_key_applied_in_submission_order() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, _consumer) = spawn_ingestor(store.clone(), Some(64), shutdown_rx);

        for i in 0..50u8 {
            handle.submit("key", vec![i], TTL).unwrap();
        }
        handle.flush().await.unwrap();

        assert_eq!(&*store.get("key").unwrap(), &[49u8]);
    }

    #[tokio::test]
    async fn test_remove_is_ordered_after_pending_puts() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, _consumer) = spawn_ingestor(store.clone(), Some(16), shutdown_rx);

        handle.submit("key", b"value".to_vec(), TTL).unwrap();
        assert!(handle.remove("key").await.unwrap());
        assert!(!handle.remove("key").await.unwrap());

        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_bounded_queue_rejects_when_full() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, _consumer) = spawn_ingestor(store.clone(), Some(2), shutdown_rx);

        // The consumer cannot run until this task yields.
        handle.submit("a", b"1".to_vec(), TTL).unwrap();
        handle.submit("b", b"2".to_vec(), TTL).unwrap();
        let err = handle.submit("c", b"3".to_vec(), TTL).unwrap_err();
        assert!(matches!(err, CacheError::QueueFull(2)));

        handle.flush().await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("c").is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_consumer_and_rejects_writes() {
        let store = Arc::new(CacheStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, consumer) = spawn_ingestor(store, Some(4), shutdown_rx);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should stop promptly")
            .unwrap();

        assert!(matches!(
            handle.submit("k", b"v".to_vec(), TTL),
            Err(CacheError::ShuttingDown)
        ));
        assert!(matches!(
            handle.put("k", b"v".to_vec(), TTL).await,
            Err(CacheError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_capacity_reported() {
        let store = Arc::new(CacheStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let (bounded, _c1) = spawn_ingestor(store.clone(), Some(8), shutdown_rx.clone());
        let (unbounded, _c2) = spawn_ingestor(store, None, shutdown_rx);

        assert_eq!(bounded.capacity(), Some(8));
        assert_eq!(unbounded.capacity(), None);
    }
}
