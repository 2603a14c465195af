//! Network-wide player directory fed by location events.
//!
//! Every process keeps its own copy: `member -> record` plus a
//! lower-case `name -> member` index so direct messages can target a player
//! by name without knowing which server they are on.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use hubnet_core::protocol::Message;
use hubnet_core::MemberId;

/// Published on the location channel whenever a player appears on, moves
/// to, or leaves a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLocation {
    pub member: MemberId,
    pub name: String,
    pub server: String,
    pub online: bool,
}

impl Message for PlayerLocation {
    const TYPE_ID: &'static str = "player.location";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub member: MemberId,
    pub name: String,
    pub server: String,
}

#[derive(Default)]
pub struct PlayerDirectory {
    by_id: DashMap<MemberId, PlayerRecord>,
    by_name: DashMap<String, MemberId>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, loc: &PlayerLocation) {
        if !loc.online {
            // Only forget the player if the offline event comes from the
            // server we last saw them on; a late quit must not undo a switch.
            let removed = self
                .by_id
                .remove_if(&loc.member, |_, rec| rec.server == loc.server);
            if let Some((_, rec)) = removed {
                self.by_name
                    .remove_if(&rec.name.to_lowercase(), |_, id| *id == loc.member);
            }
            return;
        }

        let rec = PlayerRecord {
            member: loc.member,
            name: loc.name.clone(),
            server: loc.server.clone(),
        };
        if let Some(old) = self.by_id.insert(loc.member, rec) {
            if !old.name.eq_ignore_ascii_case(&loc.name) {
                self.by_name
                    .remove_if(&old.name.to_lowercase(), |_, id| *id == loc.member);
            }
        }
        self.by_name.insert(loc.name.to_lowercase(), loc.member);
    }

    pub fn get(&self, member: MemberId) -> Option<PlayerRecord> {
        self.by_id.get(&member).map(|r| r.value().clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<PlayerRecord> {
        let id = *self.by_name.get(&name.to_lowercase())?.value();
        self.get(id)
    }

    pub fn members_on(&self, server: &str) -> Vec<MemberId> {
        self.by_id
            .iter()
            .filter(|r| r.value().server == server)
            .map(|r| *r.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
