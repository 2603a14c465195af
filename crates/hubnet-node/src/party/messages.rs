//! Party events carried on the party channel.

use serde::{Deserialize, Serialize};

use hubnet_core::protocol::Message;
use hubnet_core::{MemberId, PartyId};

use super::model::Member;

/// `joiner` (and whatever party they are in) merges into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyJoin {
    pub target: PartyId,
    /// Member of the target party, used when a receiver never saw `target`.
    #[serde(default)]
    pub host: Option<Member>,
    pub joiner: Member,
}

impl Message for PartyJoin {
    const TYPE_ID: &'static str = "party.join";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyLeave {
    pub member: MemberId,
}

impl Message for PartyLeave {
    const TYPE_ID: &'static str = "party.leave";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDisband {
    pub party: PartyId,
}

impl Message for PartyDisband {
    const TYPE_ID: &'static str = "party.disband";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInvite {
    pub party: PartyId,
    pub inviter: Member,
    pub invitee: Member,
}

impl Message for PartyInvite {
    const TYPE_ID: &'static str = "party.invite";
}

/// Every process relocates its local members of `party` to `server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyWarp {
    pub party: PartyId,
    pub server: String,
}

impl Message for PartyWarp {
    const TYPE_ID: &'static str = "party.warp";
}
