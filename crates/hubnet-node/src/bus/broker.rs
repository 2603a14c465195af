//! Broker boundary and the in-process implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::stream::{self, BoxStream};
use tokio::sync::mpsc;

use hubnet_core::error::Result;

/// Opaque handle for one broker subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Raw messages delivered on one channel, in per-publisher order.
pub type BrokerStream = BoxStream<'static, Bytes>;

pub struct Subscription {
    pub id: SubscriptionId,
    pub stream: BrokerStream,
}

/// Shared pub/sub broker (Redis-style channels).
///
/// Delivery is at-most-once. Implementations must keep per-channel FIFO for a
/// single publisher and nothing more.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()>;
    async fn subscribe(&self, channel: &str) -> Result<Subscription>;
    async fn unsubscribe(&self, channel: &str, id: SubscriptionId) -> Result<()>;
}

/// In-process broker shared by any number of buses.
#[derive(Default)]
pub struct InMemoryBroker {
    channels: DashMap<String, Vec<(SubscriptionId, mpsc::UnboundedSender<Bytes>)>>,
    next_id: AtomicU64,
    published: AtomicU64,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total publishes accepted since creation.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()> {
        self.published.fetch_add(1, Ordering::Relaxed);
        if let Some(mut subs) = self.channels.get_mut(channel) {
            // Bytes clones are refcounted; a closed receiver just falls out.
            subs.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push((id, tx));

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });
        Ok(Subscription {
            id,
            stream: Box::pin(stream),
        })
    }

    async fn unsubscribe(&self, channel: &str, id: SubscriptionId) -> Result<()> {
        if let Some(mut subs) = self.channels.get_mut(channel) {
            subs.retain(|(sid, _)| *sid != id);
            if subs.is_empty() {
                drop(subs);
                self.channels.remove_if(channel, |_, v| v.is_empty());
            }
        }
        Ok(())
    }
}
