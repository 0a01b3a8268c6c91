//! Fan-out of state changes to live subscribers.
//!
//! Every subscriber owns a bounded queue drained by its own connection task.
//! `publish` serializes the event once, snapshots the subscriber set, and
//! `try_send`s into each queue. A subscriber whose queue is full loses that
//! event; clients re-fetch current state when they reconnect.

pub mod events;

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

pub use self::events::{AlertAcknowledged, Event};

pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// A serialized event, shared between every queue it is pushed into.
pub type Payload = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving half handed to a connection. Dropping it closes the queue and
/// releases anything still buffered.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Payload>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }
}

#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Payload>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Hub {
    /// `buffer` is the per-subscriber queue depth.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    pub async fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.subscribers.write().await.insert(id, tx);
        debug!(subscriber = %id, "Subscriber registered");
        Subscription { id, rx }
    }

    /// Stop delivering to `id`. Safe to call repeatedly and from error paths;
    /// returns whether the subscriber was still registered.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.inner.subscribers.write().await.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().await.len()
    }

    /// Deliver `event` to every subscriber registered at call time.
    ///
    /// Returns how many queues accepted it. Full queues drop the event for
    /// that subscriber only; closed queues are pruned.
    pub async fn publish(&self, event: &Event) -> Result<usize, serde_json::Error> {
        let payload: Payload = Arc::from(serde_json::to_string(event)?);

        let snapshot: Vec<(SubscriberId, mpsc::Sender<Payload>)> = self
            .inner
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id, event = event.kind(), "Subscriber queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.inner.subscribers.write().await;
            for id in &closed {
                subscribers.remove(id);
            }
            debug!(pruned = closed.len(), "Pruned closed subscribers");
        }

        debug!(event = event.kind(), delivered, "Event published");
        Ok(delivered)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn ack_event() -> (Uuid, Event) {
        let id = Uuid::new_v4();
        (id, Event::AlertAcknowledged(AlertAcknowledged { id }))
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let hub = Hub::default();
        let (_, event) = ack_event();
        assert_eq!(hub.publish(&event).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn every_connected_subscriber_receives_the_same_payload() {
        let hub = Hub::default();
        let mut a = hub.subscribe().await;
        let mut b = hub.subscribe().await;
        let (id, event) = ack_event();

        assert_eq!(hub.publish(&event).await.unwrap(), 2);

        let pa = a.recv().await.unwrap();
        let pb = b.recv().await.unwrap();
        assert_eq!(pa, pb);
        let v: serde_json::Value = serde_json::from_str(&pa).unwrap();
        assert_eq!(v["type"], "alertAcknowledged");
        assert_eq!(v["data"]["id"], id.to_string());
    }

    #[tokio::test]
    async fn unsubscribed_handles_receive_nothing() {
        let hub = Hub::default();
        let mut gone = hub.subscribe().await;
        let mut stays = hub.subscribe().await;
        assert!(hub.unsubscribe(gone.id()).await);

        let (_, event) = ack_event();
        assert_eq!(hub.publish(&event).await.unwrap(), 1);
        assert!(stays.try_recv().is_some());
        assert!(gone.recv().await.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = Hub::default();
        let sub = hub.subscribe().await;
        assert!(hub.unsubscribe(sub.id()).await);
        assert!(!hub.unsubscribe(sub.id()).await);
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_without_affecting_others() {
        let hub = Hub::default();
        let dropped = hub.subscribe().await;
        let mut live = hub.subscribe().await;
        drop(dropped);

        let (_, event) = ack_event();
        assert_eq!(hub.publish(&event).await.unwrap(), 1);
        assert!(live.try_recv().is_some());
        assert_eq!(hub.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn full_subscriber_does_not_block_delivery_to_others() {
        let hub = Hub::new(1);
        let mut stalled = hub.subscribe().await;
        let mut healthy = hub.subscribe().await;

        let (_, first) = ack_event();
        let (_, second) = ack_event();
        assert_eq!(hub.publish(&first).await.unwrap(), 2);
        healthy.try_recv().unwrap();

        // `stalled` never drained its single slot.
        assert_eq!(hub.publish(&second).await.unwrap(), 1);
        assert!(healthy.try_recv().is_some());

        assert!(stalled.try_recv().is_some());
        assert!(stalled.try_recv().is_none());
        assert_eq!(hub.subscriber_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_churn_while_publishing() {
        let hub = Hub::default();
        let mut steady = hub.subscribe().await;

        let churn = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    let sub = hub.subscribe().await;
                    hub.unsubscribe(sub.id()).await;
                }
            })
        };
        for _ in 0..50 {
            let (_, event) = ack_event();
            assert!(hub.publish(&event).await.unwrap() >= 1);
            steady.recv().await.unwrap();
        }
        churn.await.unwrap();
        assert_eq!(hub.subscriber_count().await, 1);
    }
}
