use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hubnet_core::error::Result;
use hubnet_core::{MemberId, PartyId};

use super::index::{Applied, PartyIndex};
use super::messages::{PartyDisband, PartyInvite, PartyJoin, PartyLeave, PartyWarp};
use super::model::{Member, Party};
use crate::bus::{MessageBus, PublishHandle};
use crate::session::{SessionHandle, SessionProvider};

#[derive(Debug, Clone)]
struct PendingInvite {
    party: PartyId,
    inviter: Member,
    expires_at: Instant,
}

/// Party state for one process plus the handlers that keep it in step with
/// the rest of the network.
pub struct PartyEngine {
    index: PartyIndex,
    bus: MessageBus,
    channel: String,
    sessions: Arc<dyn SessionProvider>,
    invites: Mutex<HashMap<MemberId, Vec<PendingInvite>>>,
    invite_ttl: Duration,
}

impl PartyEngine {
    pub fn new(
        bus: MessageBus,
        channel: impl Into<String>,
        sessions: Arc<dyn SessionProvider>,
        invite_ttl: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            index: PartyIndex::new(),
            bus,
            channel: channel.into(),
            sessions,
            invites: Mutex::new(HashMap::new()),
            invite_ttl,
        })
    }

    /// Register the party listeners on the bus.
    pub fn install(self: &Arc<Self>) -> Result<()> {
        let weak = Arc::downgrade(self);
        self.bus.register_listener::<PartyJoin, _>(move |_, msg| {
            if let Some(engine) = weak.upgrade() {
                engine.on_join(msg);
            }
        })?;

        let weak = Arc::downgrade(self);
        self.bus.register_listener::<PartyLeave, _>(move |_, msg| {
            if let Some(engine) = weak.upgrade() {
                engine.on_leave(msg);
            }
        })?;

        let weak = Arc::downgrade(self);
        self.bus.register_listener::<PartyDisband, _>(move |_, msg| {
            if let Some(engine) = weak.upgrade() {
                engine.on_disband(msg);
            }
        })?;

        let weak = Arc::downgrade(self);
        self.bus.register_listener::<PartyInvite, _>(move |_, msg| {
            if let Some(engine) = weak.upgrade() {
                engine.on_invite(msg);
            }
        })?;

        let weak = Arc::downgrade(self);
        self.bus.register_listener::<PartyWarp, _>(move |_, msg| {
            if let Some(engine) = weak.upgrade() {
                engine.on_warp(msg);
            }
        })?;
        Ok(())
    }

    pub fn index(&self) -> &PartyIndex {
        &self.index
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Party of a locally-connected player (singleton on first reference).
    pub fn party_of(&self, session: &SessionHandle) -> Arc<Party> {
        self.index.party_of(session)
    }

    pub fn party_by_id(&self, id: PartyId) -> Option<Arc<Party>> {
        self.index.by_id(id)
    }

    pub fn party_by_member(&self, member: MemberId) -> Option<Arc<Party>> {
        self.index.by_member(member)
    }

    // ---- outbound requests: nothing changes locally until the event
    // ---- comes back from the broker.

    pub fn request_join(&self, target: &Party, joiner: Member) -> Result<PublishHandle> {
        self.bus.send(
            &self.channel,
            &PartyJoin {
                target: target.id(),
                host: target.members().next().cloned(),
                joiner,
            },
        )
    }

    pub fn request_leave(&self, member: MemberId) -> Result<PublishHandle> {
        self.bus.send(&self.channel, &PartyLeave { member })
    }

    pub fn request_disband(&self, party: PartyId) -> Result<PublishHandle> {
        self.bus.send(&self.channel, &PartyDisband { party })
    }

    /// Invite `invitee` into `inviter`'s party. An inviter not in any party
    /// yet is named by the id their singleton would get; receivers resolve it
    /// through the inviter when the invite is accepted.
    pub fn invite(&self, inviter: Member, invitee: Member) -> Result<PublishHandle> {
        let party = self
            .index
            .by_member(inviter.id)
            .map(|p| p.id())
            .unwrap_or_else(|| PartyId::seed(inviter.id));
        self.bus.send(
            &self.channel,
            &PartyInvite {
                party,
                inviter,
                invitee,
            },
        )
    }

    /// Parties `invitee` currently has unexpired invites from, newest last.
    pub fn pending_invites(&self, invitee: MemberId) -> Vec<PartyId> {
        let mut invites = self.invites.lock().unwrap_or_else(|e| e.into_inner());
        purge_expired(&mut invites, Instant::now());
        invites
            .get(&invitee)
            .map(|v| v.iter().map(|i| i.party).collect())
            .unwrap_or_default()
    }

    /// Accept the newest unexpired invite. `Ok(None)` when there is none.
    pub fn accept_invite(&self, invitee: Member) -> Result<Option<PublishHandle>> {
        let invite = {
            let mut invites = self.invites.lock().unwrap_or_else(|e| e.into_inner());
            purge_expired(&mut invites, Instant::now());
            let newest = invites.get_mut(&invitee.id).and_then(|v| v.pop());
            if invites.get(&invitee.id).is_some_and(|v| v.is_empty()) {
                invites.remove(&invitee.id);
            }
            newest
        };
        let Some(invite) = invite else {
            return Ok(None);
        };

        let handle = self.bus.send(
            &self.channel,
            &PartyJoin {
                target: invite.party,
                host: Some(invite.inviter),
                joiner: invitee,
            },
        )?;
        Ok(Some(handle))
    }

    /// Move every member of `party` to `server`.
    pub fn warp(&self, party: PartyId, server: impl Into<String>) -> Result<PublishHandle> {
        self.bus.send(
            &self.channel,
            &PartyWarp {
                party,
                server: server.into(),
            },
        )
    }

    // ---- inbound handlers. Stale references are benign races: no-op.

    fn on_join(&self, msg: &PartyJoin) {
        match self
            .index
            .apply_join(msg.target, msg.host.as_ref(), &msg.joiner)
        {
            Applied::Changed(Some(party)) => {
                tracing::debug!(party = %party.id(), member = %msg.joiner.id, size = party.len(), "party join applied");
            }
            Applied::Changed(None) | Applied::Unchanged => {
                tracing::debug!(target_party = %msg.target, member = %msg.joiner.id, "party join ignored");
            }
        }
    }

    fn on_leave(&self, msg: &PartyLeave) {
        if self.index.apply_leave(msg.member) == Applied::Unchanged {
            tracing::debug!(member = %msg.member, "party leave for unknown member ignored");
        }
    }

    fn on_disband(&self, msg: &PartyDisband) {
        if self.index.apply_disband(msg.party) == Applied::Unchanged {
            tracing::debug!(party = %msg.party, "disband for unknown party ignored");
        }
    }

    fn on_invite(&self, msg: &PartyInvite) {
        let now = Instant::now();
        let mut invites = self.invites.lock().unwrap_or_else(|e| e.into_inner());
        purge_expired(&mut invites, now);

        let pending = invites.entry(msg.invitee.id).or_default();
        pending.retain(|i| i.party != msg.party);
        pending.push(PendingInvite {
            party: msg.party,
            inviter: msg.inviter.clone(),
            expires_at: now + self.invite_ttl,
        });
    }

    fn on_warp(&self, msg: &PartyWarp) {
        let Some(party) = self.index.by_id(msg.party) else {
            tracing::debug!(party = %msg.party, "warp for unknown party ignored");
            return;
        };

        let mut moved = 0usize;
        for member in party.member_ids() {
            // Members connected elsewhere are handled by their own process.
            if let Some(handle) = self.sessions.resolve_local(member) {
                if self.sessions.relocate(&handle, &msg.server) {
                    moved += 1;
                }
            }
        }
        tracing::debug!(party = %msg.party, server = %msg.server, moved, "party warp applied");
    }
}

fn purge_expired(invites: &mut HashMap<MemberId, Vec<PendingInvite>>, now: Instant) {
    invites.retain(|_, v| {
        v.retain(|i| i.expires_at > now);
        !v.is_empty()
    });
}
