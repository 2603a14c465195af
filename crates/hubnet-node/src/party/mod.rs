//! Party consistency engine.
//!
//! - `model`: immutable party snapshots and the merge/leave algebra.
//! - `index`: the process-local dual index and its single mutation entry point.
//! - `engine`: network flows (join, leave, disband, invite, warp) on the party
//!   channel. Every process, the origin included, applies changes when the
//!   event comes back from the broker, so all of them see the same sequence.

mod engine;
mod index;
pub mod messages;
mod model;

pub use engine::PartyEngine;
pub use index::{Applied, PartyIndex};
pub use model::{Member, Party};
