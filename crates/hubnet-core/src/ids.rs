//! Identifier newtypes.
//!
//! Wrappers keep member, party, and channel ids from being confused with each
//! other. All of them serialize transparently so they read naturally on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Network-wide identity of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MemberId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identity of a party. Stable while the party exists: a leave keeps it, a
/// merge keeps the smaller of the two.
///
/// A singleton starts out with its member's id. If that id is still held by
/// a live party, the next candidate comes from [`PartyId::next_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub Uuid);

impl PartyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id a fresh singleton for `member` is first offered.
    pub fn seed(member: MemberId) -> Self {
        Self(member.0)
    }

    /// Deterministic follow-up candidate when `self` is taken. Name-based
    /// (v5), so it never matches a random member id in practice and every
    /// process derives the same sequence.
    pub fn next_for(self, member: MemberId) -> Self {
        Self(Uuid::new_v5(&self.0, member.0.as_bytes()))
    }
}

impl Default for PartyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Name of a chat channel (`"global"`, `"party"`, `"staff"`...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
