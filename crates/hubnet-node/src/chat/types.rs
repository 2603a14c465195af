//! Chat event types for both pipeline stages.
//!
//! Each stage is a tagged union (`PreChat`, `PostChat`) with a matching
//! fieldless kind enum. Modules are registered per kind; the manager picks the
//! chain from `event.kind()`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use hubnet_core::{ChannelId, MemberId};

use crate::party::Member;

/// Placeholder holding the player's text.
pub const MESSAGE_KEY: &str = "message";

/// A template with named `{placeholder}` slots.
///
/// Only the template is scanned for placeholders; substituted values are
/// copied verbatim, so player text can never inject another placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub template: String,
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}

impl ChatMessage {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            placeholders: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.placeholders.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.placeholders.get(key).map(String::as_str)
    }

    /// Fill the template. Unset placeholders render as nothing; braces that do
    /// not enclose a placeholder name are kept as written.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len() + 32);
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_placeholder_name(&after[..close]) => {
                    if let Some(v) = self.placeholders.get(&after[..close]) {
                        out.push_str(v);
                    }
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn is_placeholder_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// State shared by every chat event: the message and who receives it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatBody {
    pub message: ChatMessage,
    /// Server the message was written on.
    pub origin: String,
    pub audience: BTreeSet<MemberId>,
    /// Ids that must not be added to the audience by later modules.
    pub excluded: BTreeSet<MemberId>,
    pub cancelled: Option<String>,
}

impl ChatBody {
    pub fn new(message: ChatMessage, origin: impl Into<String>) -> Self {
        Self {
            message,
            origin: origin.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        self.message.get(MESSAGE_KEY).unwrap_or_default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.message.set(MESSAGE_KEY, text);
    }

    /// Add a recipient unless an earlier module excluded them.
    pub fn add_recipient(&mut self, member: MemberId) -> bool {
        if self.excluded.contains(&member) {
            return false;
        }
        self.audience.insert(member)
    }

    /// Keep `member` out of the audience from now on. Recipients that were
    /// already added stay; exclusion only guards later additions.
    pub fn exclude(&mut self, member: MemberId) {
        self.excluded.insert(member);
    }

    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.cancelled = Some(reason.into());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }
}

/// Common surface of both stages' tagged unions.
pub trait ChatEvent: Clone + Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
    fn sender(&self) -> &Member;
    fn body(&self) -> &ChatBody;
    fn body_mut(&mut self) -> &mut ChatBody;
}

// ---- pre-processing (origin process only)

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerChat {
    pub sender: Member,
    pub channel: ChannelId,
    pub body: ChatBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectRequest {
    pub sender: Member,
    pub target_name: String,
    /// Filled by the target-resolution module.
    pub target: Option<Member>,
    pub body: ChatBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreChat {
    Player(PlayerChat),
    Direct(DirectRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreKind {
    Player,
    Direct,
}

impl ChatEvent for PreChat {
    type Kind = PreKind;

    fn kind(&self) -> PreKind {
        match self {
            PreChat::Player(_) => PreKind::Player,
            PreChat::Direct(_) => PreKind::Direct,
        }
    }

    fn sender(&self) -> &Member {
        match self {
            PreChat::Player(e) => &e.sender,
            PreChat::Direct(e) => &e.sender,
        }
    }

    fn body(&self) -> &ChatBody {
        match self {
            PreChat::Player(e) => &e.body,
            PreChat::Direct(e) => &e.body,
        }
    }

    fn body_mut(&mut self) -> &mut ChatBody {
        match self {
            PreChat::Player(e) => &mut e.body,
            PreChat::Direct(e) => &mut e.body,
        }
    }
}

// ---- post-processing (every receiving process)

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelChat {
    pub sender: Member,
    pub channel: ChannelId,
    pub body: ChatBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectChat {
    pub sender: Member,
    pub target: Member,
    pub body: ChatBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastChat {
    pub sender: Member,
    pub exclude: BTreeSet<MemberId>,
    pub body: ChatBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostChat {
    Channel(ChannelChat),
    Direct(DirectChat),
    Broadcast(BroadcastChat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostKind {
    Channel,
    Direct,
    Broadcast,
}

impl PostKind {
    pub const ALL: [PostKind; 3] = [PostKind::Channel, PostKind::Direct, PostKind::Broadcast];

    pub fn as_str(self) -> &'static str {
        match self {
            PostKind::Channel => "channel",
            PostKind::Direct => "direct",
            PostKind::Broadcast => "broadcast",
        }
    }
}

impl ChatEvent for PostChat {
    type Kind = PostKind;

    fn kind(&self) -> PostKind {
        match self {
            PostChat::Channel(_) => PostKind::Channel,
            PostChat::Direct(_) => PostKind::Direct,
            PostChat::Broadcast(_) => PostKind::Broadcast,
        }
    }

    fn sender(&self) -> &Member {
        match self {
            PostChat::Channel(e) => &e.sender,
            PostChat::Direct(e) => &e.sender,
            PostChat::Broadcast(e) => &e.sender,
        }
    }

    fn body(&self) -> &ChatBody {
        match self {
            PostChat::Channel(e) => &e.body,
            PostChat::Direct(e) => &e.body,
            PostChat::Broadcast(e) => &e.body,
        }
    }

    fn body_mut(&mut self) -> &mut ChatBody {
        match self {
            PostChat::Channel(e) => &mut e.body,
            PostChat::Direct(e) => &mut e.body,
            PostChat::Broadcast(e) => &mut e.body,
        }
    }
}
