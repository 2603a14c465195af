//! Staged chat pipeline.
//!
//! Pre-processing runs once, on the process the player typed on, and ends in a
//! `ChatPacket` on the chat channel. Post-processing runs on every process
//! that receives the packet (origin included) and resolves the audience among
//! that process's own sessions.

pub mod channels;
mod module;
pub mod modules;
mod packet;
mod pipeline;
pub mod stores;
mod types;

pub use channels::{ChannelRegistry, ChannelSource, PartyChannel, StaticChannel};
pub use module::{ChatModule, ModuleManager};
pub use packet::{ChatPacket, Route};
pub use pipeline::{ChatPipeline, Submitted};
pub use stores::{
    BlocklistStore, Blocklists, ChatStores, Cosmetics, Gradient, GradientStore, MemoryStore,
    TagStore,
};
pub use types::{
    BroadcastChat, ChannelChat, ChatBody, ChatEvent, ChatMessage, DirectChat, DirectRequest,
    PlayerChat, PostChat, PostKind, PreChat, PreKind, MESSAGE_KEY,
};
