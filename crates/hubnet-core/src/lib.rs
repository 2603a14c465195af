//! hubnet core: the contracts every server process on the network shares.
//!
//! - `protocol`: the `type_id:payload` envelope and the message type registry.
//! - `ids`: member, party and chat channel identifiers.
//! - `error`: `HubError` and its stable `ErrorClass`.
//!
//! No async runtime here; broker drivers and tooling can depend on this crate
//! alone. `unwrap`, `expect` and `panic!` are denied: a malformed message from
//! another process must come back as a `HubError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod ids;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorClass, HubError, Result};
pub use ids::{ChannelId, MemberId, PartyId};
