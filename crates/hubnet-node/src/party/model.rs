use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hubnet_core::{MemberId, PartyId};

/// A party member. The live connection is looked up separately by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Immutable party snapshot. `join`/`leave` produce new snapshots.
///
/// The id is fixed for the life of the party: `leave` keeps it and `merge`
/// keeps the smaller of the two input ids, so processes that merge the same
/// parties in a different order agree on the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    members: BTreeMap<MemberId, Member>,
}

impl Party {
    /// Singleton under its member's own id.
    pub fn singleton(member: Member) -> Self {
        Self::singleton_as(PartyId::seed(member.id), member)
    }

    pub fn singleton_as(id: PartyId, member: Member) -> Self {
        let mut members = BTreeMap::new();
        members.insert(member.id, member);
        Self { id, members }
    }

    /// Build a party from members. Returns `None` for an empty set.
    pub fn new(id: PartyId, members: impl IntoIterator<Item = Member>) -> Option<Self> {
        let members: BTreeMap<MemberId, Member> =
            members.into_iter().map(|m| (m.id, m)).collect();
        if members.is_empty() {
            return None;
        }
        Some(Self { id, members })
    }

    pub fn id(&self) -> PartyId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a live party; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.members.contains_key(&member)
    }

    pub fn member(&self, member: MemberId) -> Option<&Member> {
        self.members.get(&member)
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.members.keys().copied()
    }

    /// Absorb `other`'s members. The smaller id survives.
    pub fn merge(&self, other: &Party) -> Party {
        let mut members = self.members.clone();
        for (id, m) in &other.members {
            members.entry(*id).or_insert_with(|| m.clone());
        }
        Party {
            id: self.id.min(other.id),
            members,
        }
    }

    /// Remove `member`. The id stays; `None` means the party is now empty and
    /// is destroyed.
    pub fn leave(&self, member: MemberId) -> Option<Party> {
        Party::new(
            self.id,
            self.members
                .values()
                .filter(|m| m.id != member)
                .cloned(),
        )
    }
}
