use std::sync::Arc;

use hubnet_core::error::{HubError, Result};

use crate::chat::channels::ChannelRegistry;
use crate::chat::module::ChatModule;
use crate::chat::stores::{Blocklists, Cosmetics};
use crate::chat::types::{ChatEvent, PostChat, PostKind};
use crate::session::SessionProvider;

/// Exclude everyone who has blocked the sender. Must run before any module
/// that adds recipients.
pub struct BlocklistFilter {
    kind: PostKind,
    blocklists: Arc<Blocklists>,
}

impl BlocklistFilter {
    pub fn new(kind: PostKind, blocklists: Arc<Blocklists>) -> Self {
        Self { kind, blocklists }
    }
}

impl ChatModule<PostChat> for BlocklistFilter {
    fn name(&self) -> &'static str {
        "blocklist"
    }

    fn kind(&self) -> PostKind {
        self.kind
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let blockers = self.blocklists.blockers_of(event.sender().id);
        let body = event.body_mut();
        for id in blockers {
            body.exclude(id);
        }
        Ok(())
    }
}

pub struct ChannelResolver {
    channels: Arc<ChannelRegistry>,
}

impl ChannelResolver {
    pub fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self { channels }
    }
}

impl ChatModule<PostChat> for ChannelResolver {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn kind(&self) -> PostKind {
        PostKind::Channel
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let PostChat::Channel(chat) = event else {
            return Ok(());
        };
        let Some(members) = self.channels.resolve(&chat.channel, chat.sender.id) else {
            tracing::debug!(channel = %chat.channel, sender = %chat.sender.id, "channel not resolvable here");
            return Ok(());
        };
        for id in members {
            chat.body.add_recipient(id);
        }
        Ok(())
    }
}

/// Target plus an echo to the sender.
pub struct DirectResolver;

impl ChatModule<PostChat> for DirectResolver {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn kind(&self) -> PostKind {
        PostKind::Direct
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let PostChat::Direct(chat) = event else {
            return Ok(());
        };
        chat.body.add_recipient(chat.target.id);
        chat.body.add_recipient(chat.sender.id);
        Ok(())
    }
}

/// Every player connected to this process, minus the packet's exclude list.
pub struct BroadcastResolver {
    sessions: Arc<dyn SessionProvider>,
}

impl BroadcastResolver {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }
}

impl ChatModule<PostChat> for BroadcastResolver {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn kind(&self) -> PostKind {
        PostKind::Broadcast
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let PostChat::Broadcast(chat) = event else {
            return Ok(());
        };
        for id in self.sessions.online_members() {
            if !chat.exclude.contains(&id) {
                chat.body.add_recipient(id);
            }
        }
        Ok(())
    }
}

/// Fills `{sender}`, `{server}`, `{channel}`, `{target}`; defaults `{tag}`.
pub struct Placeholders {
    kind: PostKind,
}

impl Placeholders {
    pub fn new(kind: PostKind) -> Self {
        Self { kind }
    }
}

impl ChatModule<PostChat> for Placeholders {
    fn name(&self) -> &'static str {
        "placeholders"
    }

    fn kind(&self) -> PostKind {
        self.kind
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let sender = event.sender().name.clone();
        let extra = match &*event {
            PostChat::Channel(c) => Some(("channel", c.channel.to_string())),
            PostChat::Direct(d) => Some(("target", d.target.name.clone())),
            PostChat::Broadcast(_) => None,
        };

        let body = event.body_mut();
        let origin = body.origin.clone();
        let msg = &mut body.message;
        msg.set("sender", sender);
        msg.set("server", origin);
        if let Some((key, value)) = extra {
            msg.set(key, value);
        }
        if msg.get("tag").is_none() {
            msg.set("tag", "");
        }
        Ok(())
    }
}

/// `{tag}` from the sender's stored tag, followed by a space.
pub struct TagDecorator {
    kind: PostKind,
    cosmetics: Arc<Cosmetics>,
}

impl TagDecorator {
    pub fn new(kind: PostKind, cosmetics: Arc<Cosmetics>) -> Self {
        Self { kind, cosmetics }
    }
}

impl ChatModule<PostChat> for TagDecorator {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn kind(&self) -> PostKind {
        self.kind
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        if let Some(tag) = self.cosmetics.tag(event.sender().id) {
            event.body_mut().message.set("tag", format!("[{tag}] "));
        }
        Ok(())
    }
}

/// Wraps `{sender}` in the sender's gradient. Runs after `placeholders`.
pub struct GradientDecorator {
    kind: PostKind,
    cosmetics: Arc<Cosmetics>,
}

impl GradientDecorator {
    pub fn new(kind: PostKind, cosmetics: Arc<Cosmetics>) -> Self {
        Self { kind, cosmetics }
    }
}

impl ChatModule<PostChat> for GradientDecorator {
    fn name(&self) -> &'static str {
        "gradient"
    }

    fn kind(&self) -> PostKind {
        self.kind
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let Some(gradient) = self.cosmetics.gradient(event.sender().id) else {
            return Ok(());
        };
        let name = event.sender().name.clone();
        let msg = &mut event.body_mut().message;
        let current = msg.get("sender").map(str::to_string).unwrap_or(name);
        if current.contains("<gradient:") {
            return Err(HubError::module("gradient", "sender already decorated"));
        }
        msg.set("sender", gradient.wrap(&current));
        Ok(())
    }
}

pub struct ChatLog {
    kind: PostKind,
}

impl ChatLog {
    pub fn new(kind: PostKind) -> Self {
        Self { kind }
    }
}

impl ChatModule<PostChat> for ChatLog {
    fn name(&self) -> &'static str {
        "log"
    }

    fn kind(&self) -> PostKind {
        self.kind
    }

    fn process(&self, event: &mut PostChat) -> Result<()> {
        let body = event.body();
        tracing::info!(
            kind = ?self.kind,
            sender = %event.sender().id,
            origin = %body.origin,
            audience = body.audience.len(),
            excluded = body.excluded.len(),
            text = %body.text(),
            "chat routed"
        );
        Ok(())
    }
}
