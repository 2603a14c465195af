//! Dual index: `party id -> party` and `member id -> party`.
//!
//! Both maps live behind one mutex. Every read-modify-write (resolve, merge,
//! update) happens inside a single critical section so no caller ever sees a
//! half-applied update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use hubnet_core::{MemberId, PartyId};

use super::model::{Member, Party};
use crate::session::SessionHandle;

#[derive(Default)]
struct DualIndex {
    by_party_id: HashMap<PartyId, Arc<Party>>,
    by_member_id: HashMap<MemberId, Arc<Party>>,
}

impl DualIndex {
    fn by_member_or_create(&mut self, member: Member) -> Arc<Party> {
        if let Some(p) = self.by_member_id.get(&member.id) {
            return Arc::clone(p);
        }
        // The member's own id may still name a party they left; skip ahead
        // until the candidate is free.
        let mut id = PartyId::seed(member.id);
        while self.by_party_id.contains_key(&id) {
            id = id.next_for(member.id);
        }
        let party = Party::singleton_as(id, member);
        self.update(&party, Some(party.clone()))
            .unwrap_or_else(|| Arc::new(party))
    }

    fn update(&mut self, previous: &Party, updated: Option<Party>) -> Option<Arc<Party>> {
        // (i) drop the previous snapshot. Members that already moved to a
        // newer party keep their entry.
        self.by_party_id.remove(&previous.id());
        for m in previous.member_ids() {
            if self
                .by_member_id
                .get(&m)
                .is_some_and(|p| p.id() == previous.id())
            {
                self.by_member_id.remove(&m);
            }
        }

        let updated = Arc::new(updated?);

        // (ii) insert under the new id. Replacing a different snapshot with
        // the same id must not leave its other members pointing at it.
        if let Some(replaced) = self
            .by_party_id
            .insert(updated.id(), Arc::clone(&updated))
        {
            self.unlink_absent(&replaced, &updated);
        }

        // (iii) point every member at the new snapshot and evict any party it
        // was absorbed from.
        for m in updated.member_ids() {
            let Some(old) = self.by_member_id.insert(m, Arc::clone(&updated)) else {
                continue;
            };
            if old.id() == updated.id() {
                continue;
            }
            if let Some(stale) = self.by_party_id.remove(&old.id()) {
                self.unlink_absent(&stale, &updated);
            }
        }

        Some(updated)
    }

    /// Remove `stale`'s members that are not part of `keep` from the member
    /// index, as long as they still point at `stale`.
    fn unlink_absent(&mut self, stale: &Party, keep: &Party) {
        for m in stale.member_ids() {
            if keep.contains(m) {
                continue;
            }
            if self
                .by_member_id
                .get(&m)
                .is_some_and(|p| p.id() == stale.id())
            {
                self.by_member_id.remove(&m);
            }
        }
    }

    fn is_consistent(&self) -> bool {
        let forward = self.by_party_id.iter().all(|(id, p)| {
            p.id() == *id
                && !p.is_empty()
                && p.member_ids().all(|m| {
                    self.by_member_id
                        .get(&m)
                        .is_some_and(|q| Arc::ptr_eq(p, q))
                })
        });
        let backward = self.by_member_id.iter().all(|(m, p)| {
            p.contains(*m)
                && self
                    .by_party_id
                    .get(&p.id())
                    .is_some_and(|q| Arc::ptr_eq(p, q))
        });
        forward && backward
    }
}

/// Outcome of applying a network-triggered change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The index changed; carries the resulting party if one still exists.
    Changed(Option<Arc<Party>>),
    /// Nothing to do: the message referenced state that is gone or already
    /// reflects the change.
    Unchanged,
}

/// Process-local party state.
#[derive(Default)]
pub struct PartyIndex {
    inner: Mutex<DualIndex>,
}

impl PartyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DualIndex> {
        // A poisoned lock still guards consistent data: every mutation is
        // applied in full before any code that could panic runs.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Party of a locally-connected player; a singleton on first reference.
    pub fn party_of(&self, session: &SessionHandle) -> Arc<Party> {
        self.lock()
            .by_member_or_create(Member::new(session.member, session.name.clone()))
    }

    pub fn by_id(&self, id: PartyId) -> Option<Arc<Party>> {
        self.lock().by_party_id.get(&id).cloned()
    }

    pub fn by_member(&self, member: MemberId) -> Option<Arc<Party>> {
        self.lock().by_member_id.get(&member).cloned()
    }

    /// Like `by_member`, but registers a singleton for a member never seen here.
    pub fn by_member_or_create(&self, member: MemberId, name: &str) -> Arc<Party> {
        self.lock().by_member_or_create(Member::new(member, name))
    }

    /// The only mutation entry point. See the module docs for the three steps.
    pub fn update(&self, previous: &Party, updated: Option<Party>) -> Option<Arc<Party>> {
        self.lock().update(previous, updated)
    }

    /// Merge `joiner`'s current party into the target party.
    ///
    /// The target is resolved by id. `host` (a member of the target when the
    /// request was made) takes over when this process never saw that id, or
    /// when the party now under that id no longer holds the host.
    pub fn apply_join(&self, target: PartyId, host: Option<&Member>, joiner: &Member) -> Applied {
        let mut idx = self.lock();

        let known = idx.by_party_id.get(&target).cloned();
        let target = match (known, host) {
            (Some(p), Some(h)) if !p.contains(h.id) => idx.by_member_or_create(h.clone()),
            (Some(p), _) => p,
            (None, Some(h)) => idx.by_member_or_create(h.clone()),
            (None, None) => return Applied::Unchanged,
        };
        if target.contains(joiner.id) {
            return Applied::Unchanged;
        }

        let joining = idx.by_member_or_create(joiner.clone());
        let merged = target.merge(&joining);
        Applied::Changed(idx.update(&joining, Some(merged)))
    }

    pub fn apply_leave(&self, member: MemberId) -> Applied {
        let mut idx = self.lock();
        let Some(current) = idx.by_member_id.get(&member).cloned() else {
            return Applied::Unchanged;
        };
        let updated = current.leave(member);
        Applied::Changed(idx.update(&current, updated))
    }

    pub fn apply_disband(&self, party: PartyId) -> Applied {
        let mut idx = self.lock();
        let Some(current) = idx.by_party_id.get(&party).cloned() else {
            return Applied::Unchanged;
        };
        idx.update(&current, None);
        Applied::Changed(None)
    }

    /// Checks that both maps agree. Cheap enough for tests and debug builds.
    pub fn is_consistent(&self) -> bool {
        self.lock().is_consistent()
    }

    pub fn parties(&self) -> Vec<Arc<Party>> {
        let mut out: Vec<Arc<Party>> = self.lock().by_party_id.values().cloned().collect();
        out.sort_by_key(|p| p.id());
        out
    }

    pub fn len(&self) -> usize {
        self.lock().by_party_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_party_id.is_empty()
    }
}
