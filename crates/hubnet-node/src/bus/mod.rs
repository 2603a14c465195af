//! Message bus: typed publish/subscribe over a shared broker.
//!
//! The broker is a boundary (`Broker` trait). `InMemoryBroker` lets several
//! node contexts talk to each other inside one process, which is how the
//! integration tests model a multi-server network.

pub mod broker;
mod message_bus;

pub use broker::{Broker, BrokerStream, InMemoryBroker, Subscription, SubscriptionId};
pub use message_bus::{MessageBus, PublishHandle};
