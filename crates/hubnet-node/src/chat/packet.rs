//! The message that carries a chat event from its origin to every process.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use hubnet_core::protocol::Message;
use hubnet_core::{ChannelId, MemberId};

use super::types::{BroadcastChat, ChannelChat, ChatBody, ChatMessage, DirectChat, PostChat};
use crate::party::Member;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    Channel { channel: ChannelId },
    Direct { target: Member },
    Broadcast {
        #[serde(default)]
        exclude: BTreeSet<MemberId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPacket {
    pub origin: String,
    pub sender: Member,
    pub route: Route,
    pub message: ChatMessage,
}

impl Message for ChatPacket {
    const TYPE_ID: &'static str = "chat.packet";
}

impl ChatPacket {
    /// Fresh post-processing event for this delivery. Audience starts empty.
    pub fn to_post(&self) -> PostChat {
        let body = ChatBody::new(self.message.clone(), self.origin.clone());
        let sender = self.sender.clone();
        match &self.route {
            Route::Channel { channel } => PostChat::Channel(ChannelChat {
                sender,
                channel: channel.clone(),
                body,
            }),
            Route::Direct { target } => PostChat::Direct(DirectChat {
                sender,
                target: target.clone(),
                body,
            }),
            Route::Broadcast { exclude } => PostChat::Broadcast(BroadcastChat {
                sender,
                exclude: exclude.clone(),
                body,
            }),
        }
    }
}
