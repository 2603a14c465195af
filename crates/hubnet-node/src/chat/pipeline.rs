use std::sync::Arc;
use std::time::Instant;

use hubnet_core::error::Result;
use hubnet_core::ChannelId;

use super::module::ModuleManager;
use super::modules::{install_post, install_pre, ModuleDeps};
use super::packet::{ChatPacket, Route};
use super::types::{
    ChatBody, ChatEvent, ChatMessage, DirectRequest, PlayerChat, PostChat, PreChat, MESSAGE_KEY,
};
use crate::bus::{MessageBus, PublishHandle};
use crate::config::ChatSection;
use crate::obs::NodeMetrics;
use crate::party::Member;
use crate::session::SessionProvider;

/// Outcome of a chat submission, reported back to the intake adapter.
pub enum Submitted {
    Published(PublishHandle),
    Cancelled(String),
}

impl Submitted {
    pub fn is_published(&self) -> bool {
        matches!(self, Submitted::Published(_))
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        match self {
            Submitted::Cancelled(r) => Some(r),
            Submitted::Published(_) => None,
        }
    }
}

/// Pre chain at intake, post chain on every receiver.
pub struct ChatPipeline {
    bus: MessageBus,
    channel: String,
    server_id: String,
    cfg: ChatSection,
    pre: ModuleManager<PreChat>,
    post: ModuleManager<PostChat>,
    sessions: Arc<dyn SessionProvider>,
    metrics: Arc<NodeMetrics>,
}

impl ChatPipeline {
    /// Build the pipeline with the built-in modules named in `cfg`.
    pub fn new(
        bus: MessageBus,
        channel: impl Into<String>,
        server_id: impl Into<String>,
        cfg: ChatSection,
        deps: ModuleDeps,
        metrics: Arc<NodeMetrics>,
    ) -> Arc<Self> {
        let pre = ModuleManager::new("pre", Arc::clone(&metrics));
        let post = ModuleManager::new("post", Arc::clone(&metrics));
        install_pre(&pre, &cfg, &deps);
        install_post(&post, &cfg, &deps);

        Arc::new(Self {
            bus,
            channel: channel.into(),
            server_id: server_id.into(),
            cfg,
            pre,
            post,
            sessions: deps.sessions,
            metrics,
        })
    }

    pub fn install(self: &Arc<Self>) -> Result<()> {
        let weak = Arc::downgrade(self);
        self.bus.register_listener::<ChatPacket, _>(move |_, packet| {
            if let Some(pipeline) = weak.upgrade() {
                pipeline.on_packet(packet);
            }
        })
    }

    /// Extra modules can be appended after the built-ins.
    pub fn pre(&self) -> &ModuleManager<PreChat> {
        &self.pre
    }

    pub fn post(&self) -> &ModuleManager<PostChat> {
        &self.post
    }

    pub fn submit_chat(
        &self,
        sender: Member,
        channel: impl Into<ChannelId>,
        raw: &str,
    ) -> Result<Submitted> {
        self.submit(PreChat::Player(PlayerChat {
            sender,
            channel: channel.into(),
            body: self.fresh_body(raw),
        }))
    }

    pub fn submit_direct(&self, sender: Member, target_name: &str, raw: &str) -> Result<Submitted> {
        self.submit(PreChat::Direct(DirectRequest {
            sender,
            target_name: target_name.to_string(),
            target: None,
            body: self.fresh_body(raw),
        }))
    }

    /// Run the pre chain and publish the result unless a module cancelled it.
    pub fn submit(&self, mut event: PreChat) -> Result<Submitted> {
        self.pre.intake(&mut event);
        if let Some(reason) = &event.body().cancelled {
            tracing::debug!(sender = %event.sender().id, %reason, "chat cancelled at intake");
            return Ok(Submitted::Cancelled(reason.clone()));
        }

        let formats = &self.cfg.formats;
        let (sender, body, route, template) = match event {
            PreChat::Player(chat) if chat.channel.as_str() == self.cfg.global_channel => {
                let route = Route::Broadcast {
                    exclude: chat.body.excluded.clone(),
                };
                (chat.sender, chat.body, route, &formats.broadcast)
            }
            PreChat::Player(chat) => {
                let route = Route::Channel {
                    channel: chat.channel,
                };
                (chat.sender, chat.body, route, &formats.channel)
            }
            PreChat::Direct(req) => {
                let Some(target) = req.target else {
                    return Ok(Submitted::Cancelled(format!(
                        "direct target {} not resolved",
                        req.target_name
                    )));
                };
                (req.sender, req.body, Route::Direct { target }, &formats.direct)
            }
        };

        let mut message = body.message;
        message.template = template.clone();
        let packet = ChatPacket {
            origin: self.server_id.clone(),
            sender,
            route,
            message,
        };
        Ok(Submitted::Published(self.bus.send(&self.channel, &packet)?))
    }

    /// Post-process an inbound packet and deliver it to local sessions.
    /// Returns how many sessions received it.
    pub fn on_packet(&self, packet: &ChatPacket) -> usize {
        let started = Instant::now();
        let mut event = packet.to_post();
        self.post.intake(&mut event);

        let kind = event.kind().as_str();
        let body = event.body();
        if let Some(reason) = &body.cancelled {
            tracing::debug!(kind, %reason, "chat cancelled after routing");
            return 0;
        }

        let rendered = body.message.render();
        let mut delivered = 0usize;
        for member in &body.audience {
            let Some(handle) = self.sessions.resolve_local(*member) else {
                continue;
            };
            if self.sessions.render_and_deliver(&handle, &rendered) {
                delivered += 1;
            } else {
                tracing::debug!(%member, "chat delivery dropped");
            }
        }

        self.metrics
            .chat_delivered
            .add(&[("kind", kind)], delivered as u64);
        self.metrics
            .post_chain_duration
            .observe(&[("kind", kind)], started.elapsed());
        delivered
    }

    fn fresh_body(&self, raw: &str) -> ChatBody {
        let message = ChatMessage::new(format!("{{{MESSAGE_KEY}}}")).with(MESSAGE_KEY, raw);
        ChatBody::new(message, self.server_id.clone())
    }
}
