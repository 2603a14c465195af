//! hubnet: party, chat and presence state shared across a network of game
//! servers.
//!
//! Hosts depend on this crate alone. `core` carries the wire contracts,
//! `node` the per-process runtime, and `prelude` the types a host wires up.

pub use hubnet_core as core;
pub use hubnet_node as node;

pub mod prelude {
    pub use hubnet_core::{ChannelId, ErrorClass, HubError, MemberId, PartyId, Result};
    pub use hubnet_node::bus::{Broker, InMemoryBroker};
    pub use hubnet_node::chat::{ChatStores, MemoryStore, Submitted};
    pub use hubnet_node::config::{load_from_file, load_from_str, NodeConfig};
    pub use hubnet_node::party::Member;
    pub use hubnet_node::session::{LocalSessions, SessionEvent, SessionHandle, SessionProvider};
    pub use hubnet_node::NodeContext;
}
