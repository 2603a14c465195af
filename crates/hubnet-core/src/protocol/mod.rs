//! Protocol modules (envelope codec + message type registry).
//!
//! Every broker message is a single UTF-8 string `"<type_id>:<payload>"`:
//! - `envelope`: panic-free split/join of the wire form.
//! - `registry`: maps type ids to decoders and Rust types to type ids.
//!
//! Malformed input is reported as `HubError` so a receive loop can log and
//! move on to the next message.

pub mod envelope;
pub mod registry;

pub use envelope::{decode_envelope, encode_envelope, Envelope, SEPARATOR};
pub use registry::{Decoded, Message, TypeRegistry};
