//! Envelope wire codec (panic-free).
//!
//! Parsing rules:
//! - Split on the *first* separator only; JSON payloads contain `:` freely.
//! - Never index raw buffers, never `unwrap()` in production paths.

use bytes::Bytes;

use crate::error::{HubError, Result};

/// Separator between type id and payload.
pub const SEPARATOR: char = ':';

/// Longest accepted type id. Type ids are short registered tags.
pub const MAX_TYPE_ID_LEN: usize = 64;

/// Borrowed view of one inbound broker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Registered message tag (e.g. `party.join`).
    pub type_id: &'a str,
    /// The type's own serialization (JSON).
    pub payload: &'a str,
}

/// Decode an envelope from raw broker bytes.
pub fn decode_envelope(raw: &[u8]) -> Result<Envelope<'_>> {
    let s = std::str::from_utf8(raw)
        .map_err(|e| HubError::Decode(format!("envelope is not utf-8: {e}")))?;

    let (type_id, payload) = s
        .split_once(SEPARATOR)
        .ok_or_else(|| HubError::Decode("envelope missing type separator".into()))?;

    if type_id.is_empty() {
        return Err(HubError::Decode("envelope type id is empty".into()));
    }
    if type_id.len() > MAX_TYPE_ID_LEN {
        return Err(HubError::Decode(format!(
            "envelope type id longer than {MAX_TYPE_ID_LEN} bytes"
        )));
    }

    Ok(Envelope { type_id, payload })
}

/// Encode `type_id:payload` into a broker message.
pub fn encode_envelope(type_id: &str, payload: &str) -> Bytes {
    let mut s = String::with_capacity(type_id.len() + 1 + payload.len());
    s.push_str(type_id);
    s.push(SEPARATOR);
    s.push_str(payload);
    Bytes::from(s)
}
