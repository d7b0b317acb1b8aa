use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error};
use ulid::Ulid;

use crate::event::RelayEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub Ulid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Connection lifecycle as seen by the hub. Only `Open` subscribers
/// receive broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Connecting,
    Open,
    Closing,
}

/// Handle returned to the transport when a subscriber is accepted.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::UnboundedReceiver<Utf8Bytes>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

struct Subscriber {
    sender: mpsc::UnboundedSender<Utf8Bytes>,
    readiness: Readiness,
}

/// Registry of connected subscribers and fan-out point for relay events.
///
/// Outbound queues are unbounded: a slow subscriber buffers in memory rather
/// than stalling the broadcast.
#[derive(Clone, Default)]
pub struct SubscriberHub {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber in the `Connecting` state.
    pub async fn accept(&self) -> Subscription {
        let id = SubscriberId::new();
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(
            id,
            Subscriber {
                sender,
                readiness: Readiness::Connecting,
            },
        );

        Subscription { id, receiver }
    }

    pub async fn mark_open(&self, id: SubscriberId) -> bool {
        self.set_readiness(id, Readiness::Open).await
    }

    pub async fn mark_closing(&self, id: SubscriberId) -> bool {
        self.set_readiness(id, Readiness::Closing).await
    }

    async fn set_readiness(&self, id: SubscriberId, readiness: Readiness) -> bool {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.get_mut(&id) {
            Some(subscriber) => {
                subscriber.readiness = readiness;
                true
            }
            None => false,
        }
    }

    /// Deregisters a subscriber. Returns `false` if it was already gone.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        subscribers.remove(&id).is_some()
    }

    pub async fn readiness(&self, id: SubscriberId) -> Option<Readiness> {
        let subscribers = self.subscribers.read().await;
        subscribers.get(&id).map(|s| s.readiness)
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    pub async fn open_count(&self) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers
            .values()
            .filter(|s| s.readiness == Readiness::Open)
            .count()
    }

    /// Serializes `event` once and queues it for every open subscriber.
    ///
    /// Never fails: per-subscriber errors are counted in the report.
    pub async fn broadcast(&self, event: &RelayEvent) -> BroadcastReport {
        match serde_json::to_string(event) {
            Ok(json) => self.broadcast_text(Utf8Bytes::from(json)).await,
            Err(e) => {
                error!(error = %e, "failed to serialize relay event");
                BroadcastReport::default()
            }
        }
    }

    async fn broadcast_text(&self, payload: Utf8Bytes) -> BroadcastReport {
        let subscribers = self.subscribers.read().await;
        let mut report = BroadcastReport::default();

        for (id, subscriber) in subscribers.iter() {
            if subscriber.readiness != Readiness::Open {
                report.skipped += 1;
                continue;
            }

            if subscriber.sender.send(payload.clone()).is_err() {
                debug!(subscriber = %id, "subscriber queue closed");
                report.failed += 1;
            } else {
                report.delivered += 1;
            }
        }

        report
    }
}
