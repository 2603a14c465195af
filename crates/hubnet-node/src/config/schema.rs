use std::collections::HashSet;

use serde::Deserialize;

use hubnet_core::error::{HubError, Result};
use hubnet_core::MemberId;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub version: u32,

    pub node: NodeSection,

    #[serde(default)]
    pub channels: ChannelNames,

    #[serde(default)]
    pub chat: ChatSection,

    #[serde(default)]
    pub party: PartySection,
}

impl NodeConfig {
    /// Minimal valid config for a server id; everything else defaulted.
    pub fn for_server(server_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            node: NodeSection {
                server_id: server_id.into(),
            },
            channels: ChannelNames::default(),
            chat: ChatSection::default(),
            party: PartySection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HubError::UnsupportedVersion);
        }
        if self.node.server_id.trim().is_empty() {
            return Err(HubError::BadConfig("node.server_id must not be empty".into()));
        }

        self.channels.validate()?;
        self.chat.validate()?;
        self.party.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSection {
    /// Name other servers use to route players here.
    pub server_id: String,
}

/// Well-known broker channels. Every process on the network must agree on them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelNames {
    #[serde(default = "default_party_channel")]
    pub party: String,

    #[serde(default = "default_chat_channel")]
    pub chat: String,

    #[serde(default = "default_location_channel")]
    pub location: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            party: default_party_channel(),
            chat: default_chat_channel(),
            location: default_location_channel(),
        }
    }
}

impl ChannelNames {
    pub fn validate(&self) -> Result<()> {
        let all = [&self.party, &self.chat, &self.location];
        if all.iter().any(|c| c.trim().is_empty()) {
            return Err(HubError::BadConfig("channels.* must not be empty".into()));
        }
        let unique: HashSet<&String> = all.iter().copied().collect();
        if unique.len() != all.len() {
            return Err(HubError::BadConfig("channels.* must be distinct".into()));
        }
        Ok(())
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.party, &self.chat, &self.location]
    }
}

fn default_party_channel() -> String {
    "hubnet:party".into()
}
fn default_chat_channel() -> String {
    "hubnet:chat".into()
}
fn default_location_channel() -> String {
    "hubnet:location".into()
}

/// Pre-processing module names, in the order they should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreModuleName {
    Sanitize,
    WordFilter,
    DirectTarget,
}

/// Post-processing module names, in the order they should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostModuleName {
    Blocklist,
    Channel,
    Direct,
    Broadcast,
    Placeholders,
    Tags,
    Gradient,
    Log,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatSection {
    /// Player chat on this channel is routed as a network broadcast.
    #[serde(default = "default_global_channel")]
    pub global_channel: String,

    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Per-session outbound queue depth for local delivery.
    #[serde(default = "default_session_queue")]
    pub session_queue: usize,

    #[serde(default)]
    pub blocked_words: Vec<String>,

    #[serde(default)]
    pub static_channels: Vec<StaticChannel>,

    #[serde(default = "default_pre_modules")]
    pub pre_modules: Vec<PreModuleName>,

    #[serde(default = "default_post_modules")]
    pub post_modules: Vec<PostModuleName>,

    #[serde(default)]
    pub formats: ChatFormats,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            global_channel: default_global_channel(),
            max_message_len: default_max_message_len(),
            session_queue: default_session_queue(),
            blocked_words: Vec::new(),
            static_channels: Vec::new(),
            pre_modules: default_pre_modules(),
            post_modules: default_post_modules(),
            formats: ChatFormats::default(),
        }
    }
}

impl ChatSection {
    pub fn validate(&self) -> Result<()> {
        if self.global_channel.trim().is_empty() {
            return Err(HubError::BadConfig("chat.global_channel must not be empty".into()));
        }
        if !(1..=4096).contains(&self.max_message_len) {
            return Err(HubError::BadConfig(
                "chat.max_message_len must be between 1 and 4096".into(),
            ));
        }
        if !(1..=65536).contains(&self.session_queue) {
            return Err(HubError::BadConfig(
                "chat.session_queue must be between 1 and 65536".into(),
            ));
        }

        let mut seen = HashSet::new();
        for ch in &self.static_channels {
            if ch.id.trim().is_empty() {
                return Err(HubError::BadConfig("chat.static_channels id must not be empty".into()));
            }
            if ch.id == self.global_channel || ch.id == "party" {
                return Err(HubError::BadConfig(format!(
                    "chat.static_channels id {} is reserved",
                    ch.id
                )));
            }
            if !seen.insert(ch.id.as_str()) {
                return Err(HubError::BadConfig(format!(
                    "chat.static_channels id {} is duplicated",
                    ch.id
                )));
            }
        }

        let mut pre = HashSet::new();
        if !self.pre_modules.iter().all(|m| pre.insert(*m)) {
            return Err(HubError::BadConfig("chat.pre_modules has duplicates".into()));
        }
        let mut post = HashSet::new();
        if !self.post_modules.iter().all(|m| post.insert(*m)) {
            return Err(HubError::BadConfig("chat.post_modules has duplicates".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticChannel {
    pub id: String,
    #[serde(default)]
    pub members: Vec<MemberId>,
}

/// Message templates. `{name}` slots are filled by the placeholder modules.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatFormats {
    #[serde(default = "default_channel_format")]
    pub channel: String,

    #[serde(default = "default_direct_format")]
    pub direct: String,

    #[serde(default = "default_broadcast_format")]
    pub broadcast: String,
}

impl Default for ChatFormats {
    fn default() -> Self {
        Self {
            channel: default_channel_format(),
            direct: default_direct_format(),
            broadcast: default_broadcast_format(),
        }
    }
}

fn default_global_channel() -> String {
    "global".into()
}
fn default_max_message_len() -> usize {
    256
}
fn default_session_queue() -> usize {
    256
}
fn default_pre_modules() -> Vec<PreModuleName> {
    vec![
        PreModuleName::Sanitize,
        PreModuleName::WordFilter,
        PreModuleName::DirectTarget,
    ]
}
fn default_post_modules() -> Vec<PostModuleName> {
    vec![
        PostModuleName::Blocklist,
        PostModuleName::Channel,
        PostModuleName::Direct,
        PostModuleName::Broadcast,
        PostModuleName::Placeholders,
        PostModuleName::Tags,
        PostModuleName::Gradient,
        PostModuleName::Log,
    ]
}
fn default_channel_format() -> String {
    "[{channel}] {tag}{sender}: {message}".into()
}
fn default_direct_format() -> String {
    "[{sender} -> {target}] {message}".into()
}
fn default_broadcast_format() -> String {
    "{tag}{sender}: {message}".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartySection {
    #[serde(default = "default_invite_ttl_ms")]
    pub invite_ttl_ms: u64,
}

impl Default for PartySection {
    fn default() -> Self {
        Self {
            invite_ttl_ms: default_invite_ttl_ms(),
        }
    }
}

impl PartySection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=600000).contains(&self.invite_ttl_ms) {
            return Err(HubError::BadConfig(
                "party.invite_ttl_ms must be between 1000 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_invite_ttl_ms() -> u64 {
    60000
}
