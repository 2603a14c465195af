use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use hubnet_core::error::{HubError, Result};
use hubnet_core::protocol::{Decoded, Message, TypeRegistry};

use crate::bus::broker::{Broker, SubscriptionId};
use crate::obs::NodeMetrics;

type Listener = Arc<dyn Fn(&str, &Decoded) + Send + Sync>;

/// Completion of one publish. Awaiting it is optional; dropping it never
/// cancels the publish.
pub struct PublishHandle {
    rx: oneshot::Receiver<Result<()>>,
}

impl PublishHandle {
    /// Wait until the broker accepted (or rejected) the message.
    pub async fn wait(self) -> Result<()> {
        self.rx
            .await
            .map_err(|_| HubError::Broker("publisher stopped before completion".into()))?
    }
}

struct Outbound {
    channel: String,
    payload: Bytes,
    done: oneshot::Sender<Result<()>>,
}

struct ChannelTask {
    id: SubscriptionId,
    task: JoinHandle<()>,
}

struct BusInner {
    registry: Arc<TypeRegistry>,
    broker: Arc<dyn Broker>,
    metrics: Arc<NodeMetrics>,
    listeners: DashMap<&'static str, Arc<Vec<Listener>>>,
    subscriptions: DashMap<String, ChannelTask>,
    admin: Mutex<()>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

/// Typed pub/sub facade over a [`Broker`].
///
/// Sends are queued to one publisher task per bus, so messages from this
/// process on one channel reach the broker in send order. Each subscribed
/// channel gets its own inbound task.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    /// Build a bus. Must be called from within a tokio runtime.
    pub fn new(
        registry: Arc<TypeRegistry>,
        broker: Arc<dyn Broker>,
        metrics: Arc<NodeMetrics>,
    ) -> Result<Self> {
        let rt = Handle::try_current()
            .map_err(|e| HubError::Internal(format!("message bus needs a tokio runtime: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        rt.spawn(run_publisher(rx, Arc::clone(&broker), Arc::clone(&metrics)));

        Ok(Self {
            inner: Arc::new(BusInner {
                registry,
                broker,
                metrics,
                listeners: DashMap::new(),
                subscriptions: DashMap::new(),
                admin: Mutex::new(()),
                outbound: tx,
            }),
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    /// Publish `msg` on `channel`.
    ///
    /// Unregistered types and serialization failures are returned here and
    /// nothing is published. Broker failures only show up on the handle.
    pub fn send<T: Message>(&self, channel: &str, msg: &T) -> Result<PublishHandle> {
        let payload = self.inner.registry.encode(msg)?;

        let (done, rx) = oneshot::channel();
        self.inner
            .outbound
            .send(Outbound {
                channel: channel.to_string(),
                payload,
                done,
            })
            .map_err(|_| HubError::Broker("publisher task is gone".into()))?;
        Ok(PublishHandle { rx })
    }

    /// Invoke `handler` for every inbound `T` on any subscribed channel.
    /// Registers `T` with the type registry if needed.
    pub fn register_listener<T, F>(&self, handler: F) -> Result<()>
    where
        T: Message,
        F: Fn(&str, &T) + Send + Sync + 'static,
    {
        self.inner.registry.register::<T>()?;

        let listener: Listener = Arc::new(move |channel: &str, decoded: &Decoded| {
            if let Some(msg) = decoded.downcast_ref::<T>() {
                handler(channel, msg);
            }
        });

        // Copy-on-write: dispatch clones the Arc and never holds the shard.
        let mut entry = self.inner.listeners.entry(T::TYPE_ID).or_default();
        let mut next: Vec<Listener> = (**entry.value()).clone();
        next.push(listener);
        *entry.value_mut() = Arc::new(next);
        Ok(())
    }

    pub fn listener_count(&self, type_id: &str) -> usize {
        self.inner
            .listeners
            .get(type_id)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// Start receiving on `channel`. Idempotent.
    pub async fn subscribe(&self, channel: &str) -> Result<()> {
        let _guard = self.inner.admin.lock().await;
        if self.inner.subscriptions.contains_key(channel) {
            return Ok(());
        }

        let sub = self.inner.broker.subscribe(channel).await?;
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(run_inbound(weak, channel.to_string(), sub.stream));

        self.inner.subscriptions.insert(
            channel.to_string(),
            ChannelTask { id: sub.id, task },
        );
        self.inner.metrics.subscriptions.inc(&[("channel", channel)]);
        tracing::info!(%channel, "subscribed");
        Ok(())
    }

    /// Stop receiving on `channel`. Idempotent.
    pub async fn unsubscribe(&self, channel: &str) -> Result<()> {
        let _guard = self.inner.admin.lock().await;
        let Some((_, sub)) = self.inner.subscriptions.remove(channel) else {
            return Ok(());
        };

        sub.task.abort();
        self.inner.metrics.subscriptions.dec(&[("channel", channel)]);
        tracing::info!(%channel, "unsubscribed");
        self.inner.broker.unsubscribe(channel, sub.id).await
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .inner
            .subscriptions
            .iter()
            .map(|e| e.key().clone())
            .collect();
        out.sort();
        out
    }

    /// Process one raw broker message as if it arrived on `channel`.
    /// Returns how many listeners ran.
    pub fn handle_inbound(&self, channel: &str, raw: &[u8]) -> usize {
        self.inner.handle_inbound(channel, raw)
    }
}

impl BusInner {
    fn handle_inbound(&self, channel: &str, raw: &[u8]) -> usize {
        self.metrics.inbound.inc(&[("channel", channel)]);

        let decoded = match self.registry.decode(raw) {
            Ok(Some(d)) => d,
            Ok(None) => {
                tracing::trace!(%channel, "dropping message of unknown type");
                self.metrics.unknown_types.inc(&[("channel", channel)]);
                return 0;
            }
            Err(e) => {
                tracing::warn!(%channel, error = %e, "dropping undecodable message");
                self.metrics.decode_errors.inc(&[("channel", channel)]);
                return 0;
            }
        };

        let Some(listeners) = self
            .listeners
            .get(decoded.type_id)
            .map(|l| Arc::clone(l.value()))
        else {
            return 0;
        };

        for listener in listeners.iter() {
            let res = catch_unwind(AssertUnwindSafe(|| listener(channel, &decoded)));
            if res.is_err() {
                tracing::warn!(%channel, type_id = decoded.type_id, "listener panicked");
                self.metrics
                    .listener_panics
                    .inc(&[("type_id", decoded.type_id)]);
            }
        }
        listeners.len()
    }
}

async fn run_publisher(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    broker: Arc<dyn Broker>,
    metrics: Arc<NodeMetrics>,
) {
    while let Some(out) = rx.recv().await {
        let res = broker.publish(&out.channel, out.payload).await;
        match &res {
            Ok(()) => metrics.published.inc(&[("channel", &out.channel)]),
            Err(e) => {
                tracing::warn!(channel = %out.channel, error = %e, "publish failed");
                metrics.publish_failures.inc(&[("channel", &out.channel)]);
            }
        }
        let _ = out.done.send(res);
    }
}

async fn run_inbound(
    bus: Weak<BusInner>,
    channel: String,
    mut stream: crate::bus::BrokerStream,
) {
    while let Some(raw) = stream.next().await {
        let Some(inner) = bus.upgrade() else {
            break;
        };
        inner.handle_inbound(&channel, &raw);
    }
    tracing::debug!(%channel, "inbound stream ended");
}
