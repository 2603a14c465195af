//! Shared error type across hubnet crates.

use thiserror::Error;

/// Error classes (stable API).
///
/// Callers branch on the class, not on the concrete variant: only
/// `LocalConfiguration` is ever surfaced to the code that issued a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Misuse detected locally and synchronously (unregistered type, bad config).
    LocalConfiguration,
    /// Inbound message refers to state that is gone locally. Always a no-op.
    TransientRace,
    /// Malformed or unknown inbound payload.
    Decode,
    /// A chat pipeline module failed.
    ModuleFailure,
    /// Serialization or broker failure on the outbound path.
    Transport,
    /// Internal invariant broken.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::LocalConfiguration => "LOCAL_CONFIGURATION",
            ErrorClass::TransientRace => "TRANSIENT_RACE",
            ErrorClass::Decode => "DECODE",
            ErrorClass::ModuleFailure => "MODULE_FAILURE",
            ErrorClass::Transport => "TRANSPORT",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HubError>;

/// Unified error type used by core and node.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("unregistered message type: {0}")]
    UnregisteredType(&'static str),
    #[error("type id {type_id} already registered for {existing}")]
    DuplicateType {
        type_id: &'static str,
        existing: &'static str,
    },
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("stale reference: {0}")]
    Stale(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("broker: {0}")]
    Broker(String),
    #[error("module {module} failed: {reason}")]
    Module { module: &'static str, reason: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl HubError {
    /// Map the error to its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            HubError::UnregisteredType(_)
            | HubError::DuplicateType { .. }
            | HubError::BadConfig(_)
            | HubError::UnsupportedVersion => ErrorClass::LocalConfiguration,
            HubError::Stale(_) => ErrorClass::TransientRace,
            HubError::Decode(_) => ErrorClass::Decode,
            HubError::Module { .. } => ErrorClass::ModuleFailure,
            HubError::Encode(_) | HubError::Broker(_) => ErrorClass::Transport,
            HubError::Internal(_) => ErrorClass::Internal,
        }
    }

    pub fn module(module: &'static str, reason: impl Into<String>) -> Self {
        HubError::Module {
            module,
            reason: reason.into(),
        }
    }
}
