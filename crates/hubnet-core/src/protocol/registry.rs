//! Message type registry.
//!
//! One registry per process context (never a global). It is populated at
//! startup; registering later is allowed but every process should agree on the
//! set of type ids it understands before it subscribes.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HubError, Result};
use crate::protocol::envelope::{decode_envelope, encode_envelope};

/// A message that can travel over the bus.
///
/// `TYPE_ID` is the globally agreed tag put in front of the payload. It must
/// still be registered with a [`TypeRegistry`] before it can be sent or
/// received.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_ID: &'static str;
}

type DecodeFn = fn(&str) -> Result<Arc<dyn Any + Send + Sync>>;

#[derive(Clone, Copy)]
struct Entry {
    rust_type: TypeId,
    rust_name: &'static str,
    decode: DecodeFn,
}

/// A decoded inbound message, type-erased until a listener downcasts it.
#[derive(Clone)]
pub struct Decoded {
    pub type_id: &'static str,
    pub value: Arc<dyn Any + Send + Sync>,
}

impl Decoded {
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for Decoded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoded").field("type_id", &self.type_id).finish()
    }
}

fn decode_as<T: Message>(payload: &str) -> Result<Arc<dyn Any + Send + Sync>> {
    let value: T = serde_json::from_str(payload)
        .map_err(|e| HubError::Decode(format!("{} payload: {e}", T::TYPE_ID)))?;
    Ok(Arc::new(value))
}

/// `type_id -> decoder` and `Rust type -> type_id`.
#[derive(Default)]
pub struct TypeRegistry {
    by_tag: RwLock<HashMap<&'static str, Entry>>,
    by_type: RwLock<HashMap<TypeId, &'static str>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `T::TYPE_ID`. Re-registering the same type is a no-op.
    pub fn register<T: Message>(&self) -> Result<()> {
        let entry = Entry {
            rust_type: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            decode: decode_as::<T>,
        };

        let mut by_tag = self.by_tag.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = by_tag.get(T::TYPE_ID) {
            if existing.rust_type == entry.rust_type {
                return Ok(());
            }
            return Err(HubError::DuplicateType {
                type_id: T::TYPE_ID,
                existing: existing.rust_name,
            });
        }
        by_tag.insert(T::TYPE_ID, entry);
        drop(by_tag);

        self.by_type
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(entry.rust_type, T::TYPE_ID);
        Ok(())
    }

    pub fn is_registered(&self, type_id: &str) -> bool {
        self.by_tag
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(type_id)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self
            .by_tag
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        out.sort_unstable();
        out
    }

    /// Serialize `msg` into its wire form.
    ///
    /// Fails with `UnregisteredType` before any serialization happens if `T`
    /// was never registered.
    pub fn encode<T: Message>(&self, msg: &T) -> Result<Bytes> {
        let type_id = self
            .by_type
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(HubError::UnregisteredType(T::TYPE_ID))?;

        let payload =
            serde_json::to_string(msg).map_err(|e| HubError::Encode(format!("{type_id}: {e}")))?;
        Ok(encode_envelope(type_id, &payload))
    }

    /// Decode a raw broker message.
    ///
    /// - `Ok(None)`: well-formed but the type id is unknown here (dropped so
    ///   older processes ignore newer message types).
    /// - `Err(Decode)`: malformed envelope or payload.
    pub fn decode(&self, raw: &[u8]) -> Result<Option<Decoded>> {
        let env = decode_envelope(raw)?;

        let entry = {
            let by_tag = self.by_tag.read().unwrap_or_else(|e| e.into_inner());
            match by_tag.get_key_value(env.type_id) {
                Some((tag, entry)) => Some((*tag, *entry)),
                None => None,
            }
        };
        let Some((type_id, entry)) = entry else {
            return Ok(None);
        };

        let value = (entry.decode)(env.payload)?;
        Ok(Some(Decoded { type_id, value }))
    }
}
