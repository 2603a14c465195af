//! Per-process node context.
//!
//! - Builds every component from one validated config (Result, not panic).
//! - Registers all message types and listeners before anything is subscribed.
//! - No global state: several contexts may live in one process.

use std::sync::Arc;
use std::time::Duration;

use hubnet_core::error::Result;
use hubnet_core::protocol::TypeRegistry;
use hubnet_core::ChannelId;

use crate::bus::{Broker, MessageBus, PublishHandle};
use crate::chat::{
    Blocklists, ChannelRegistry, ChatPacket, ChatPipeline, ChatStores, Cosmetics, PartyChannel,
};
use crate::chat::modules::ModuleDeps;
use crate::config::NodeConfig;
use crate::directory::{PlayerDirectory, PlayerLocation};
use crate::obs::NodeMetrics;
use crate::party::messages::{PartyDisband, PartyInvite, PartyJoin, PartyLeave, PartyWarp};
use crate::party::{Member, PartyEngine};
use crate::session::SessionProvider;

/// Channel id players use for party chat.
pub const PARTY_CHAT: &str = "party";

#[derive(Clone)]
pub struct NodeContext {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    cfg: NodeConfig,
    bus: MessageBus,
    metrics: Arc<NodeMetrics>,
    directory: Arc<PlayerDirectory>,
    party: Arc<PartyEngine>,
    chat: Arc<ChatPipeline>,
    channels: Arc<ChannelRegistry>,
    blocklists: Arc<Blocklists>,
    cosmetics: Arc<Cosmetics>,
    sessions: Arc<dyn SessionProvider>,
}

impl NodeContext {
    /// Build a node. Must be called from within a tokio runtime.
    pub fn new(
        cfg: NodeConfig,
        broker: Arc<dyn Broker>,
        sessions: Arc<dyn SessionProvider>,
        stores: ChatStores,
    ) -> Result<Self> {
        cfg.validate()?;

        // 1) Wire types
        let registry = Arc::new(TypeRegistry::new());
        registry.register::<PartyJoin>()?;
        registry.register::<PartyLeave>()?;
        registry.register::<PartyDisband>()?;
        registry.register::<PartyInvite>()?;
        registry.register::<PartyWarp>()?;
        registry.register::<ChatPacket>()?;
        registry.register::<PlayerLocation>()?;

        let metrics = Arc::new(NodeMetrics::new());
        let bus = MessageBus::new(registry, broker, Arc::clone(&metrics))?;

        // 2) Directory
        let directory = Arc::new(PlayerDirectory::new());
        {
            let directory = Arc::clone(&directory);
            bus.register_listener::<PlayerLocation, _>(move |_, loc| directory.apply(loc))?;
        }

        // 3) Parties
        let party = PartyEngine::new(
            bus.clone(),
            cfg.channels.party.clone(),
            Arc::clone(&sessions),
            Duration::from_millis(cfg.party.invite_ttl_ms),
        );
        party.install()?;

        // 4) Chat
        let channels = Arc::new(ChannelRegistry::new());
        channels.register(ChannelId::from(PARTY_CHAT), Arc::new(PartyChannel::new(&party)));
        for ch in &cfg.chat.static_channels {
            channels.register_static(ChannelId::new(ch.id.clone()), ch.members.iter().copied());
        }

        let blocklists = Arc::new(Blocklists::load(stores.blocklists)?);
        let cosmetics = Arc::new(Cosmetics::load(stores.tags, stores.gradients)?);

        let chat = ChatPipeline::new(
            bus.clone(),
            cfg.channels.chat.clone(),
            cfg.node.server_id.clone(),
            cfg.chat.clone(),
            ModuleDeps {
                directory: Arc::clone(&directory),
                channels: Arc::clone(&channels),
                sessions: Arc::clone(&sessions),
                blocklists: Arc::clone(&blocklists),
                cosmetics: Arc::clone(&cosmetics),
            },
            Arc::clone(&metrics),
        );
        chat.install()?;

        Ok(Self {
            inner: Arc::new(NodeInner {
                cfg,
                bus,
                metrics,
                directory,
                party,
                chat,
                channels,
                blocklists,
                cosmetics,
                sessions,
            }),
        })
    }

    /// Subscribe the well-known channels.
    pub async fn start(&self) -> Result<()> {
        for channel in self.inner.cfg.channels.all() {
            self.inner.bus.subscribe(channel).await?;
        }
        tracing::info!(server = %self.server_id(), "hubnet node started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        for channel in self.inner.bus.subscribed_channels() {
            self.inner.bus.unsubscribe(&channel).await?;
        }
        tracing::info!(server = %self.server_id(), "hubnet node stopped");
        Ok(())
    }

    /// Tell the network `member` is (or no longer is) on this server.
    pub fn announce_location(&self, member: &Member, online: bool) -> Result<PublishHandle> {
        self.inner.bus.send(
            &self.inner.cfg.channels.location,
            &PlayerLocation {
                member: member.id,
                name: member.name.clone(),
                server: self.server_id().to_string(),
                online,
            },
        )
    }

    pub fn cfg(&self) -> &NodeConfig {
        &self.inner.cfg
    }

    pub fn server_id(&self) -> &str {
        &self.inner.cfg.node.server_id
    }

    pub fn bus(&self) -> &MessageBus {
        &self.inner.bus
    }

    pub fn metrics(&self) -> Arc<NodeMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn directory(&self) -> Arc<PlayerDirectory> {
        Arc::clone(&self.inner.directory)
    }

    pub fn party(&self) -> Arc<PartyEngine> {
        Arc::clone(&self.inner.party)
    }

    pub fn chat(&self) -> Arc<ChatPipeline> {
        Arc::clone(&self.inner.chat)
    }

    pub fn channels(&self) -> Arc<ChannelRegistry> {
        Arc::clone(&self.inner.channels)
    }

    pub fn blocklists(&self) -> Arc<Blocklists> {
        Arc::clone(&self.inner.blocklists)
    }

    pub fn cosmetics(&self) -> Arc<Cosmetics> {
        Arc::clone(&self.inner.cosmetics)
    }

    pub fn sessions(&self) -> Arc<dyn SessionProvider> {
        Arc::clone(&self.inner.sessions)
    }
}
