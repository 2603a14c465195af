//! hubnet node runtime.
//!
//! One `NodeContext` per server process: it owns the message bus, the party
//! engine, the player directory and the chat pipeline, and is handed the
//! broker, the local session provider and the stores by the host. Several
//! contexts can share one `InMemoryBroker` to model a network in-process.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod bus;
pub mod chat;
pub mod config;
pub mod context;
pub mod directory;
pub mod obs;
pub mod party;
pub mod session;
pub mod telemetry;

pub use context::NodeContext;
