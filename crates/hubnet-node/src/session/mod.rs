//! Local session boundary.
//!
//! The core never owns a live connection. It asks the `SessionProvider` for a
//! handle by member id, and the answer may be "not here" at any moment.

mod local;

pub use local::{Connection, LocalSessions, SessionEvent};

use hubnet_core::MemberId;

/// Lookup key for a locally-connected player. Carries no connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub member: MemberId,
    pub name: String,
}

/// Supplied by the hosting server process.
pub trait SessionProvider: Send + Sync {
    /// The player's local session, if connected to this process.
    fn resolve_local(&self, member: MemberId) -> Option<SessionHandle>;

    /// Render target for chat. Returns false if the message was not delivered.
    fn render_and_deliver(&self, handle: &SessionHandle, rendered: &str) -> bool;

    /// Ask the platform to move the player to another server.
    fn relocate(&self, handle: &SessionHandle, server: &str) -> bool;

    /// Every member currently connected to this process.
    fn online_members(&self) -> Vec<MemberId>;
}
