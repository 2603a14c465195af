//! Chat channel registry: channel id -> member set.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use dashmap::{DashMap, DashSet};

use hubnet_core::{ChannelId, MemberId};

use crate::party::PartyEngine;

/// Resolves the members of one channel, possibly relative to the sender.
pub trait ChannelSource: Send + Sync {
    /// `None` when the channel cannot be resolved for this sender.
    fn members(&self, sender: MemberId) -> Option<BTreeSet<MemberId>>;
}

/// Party chat: the sender's party, as this process currently sees it.
pub struct PartyChannel {
    engine: Weak<PartyEngine>,
}

impl PartyChannel {
    pub fn new(engine: &Arc<PartyEngine>) -> Self {
        Self {
            engine: Arc::downgrade(engine),
        }
    }
}

impl ChannelSource for PartyChannel {
    fn members(&self, sender: MemberId) -> Option<BTreeSet<MemberId>> {
        let engine = self.engine.upgrade()?;
        let party = engine.party_by_member(sender)?;
        Some(party.member_ids().collect())
    }
}

/// Fixed-membership channel (staff, build team...). Membership is seeded from
/// config and can change at runtime on this process.
#[derive(Default)]
pub struct StaticChannel {
    members: DashSet<MemberId>,
}

impl StaticChannel {
    pub fn new(members: impl IntoIterator<Item = MemberId>) -> Self {
        let set = DashSet::new();
        for m in members {
            set.insert(m);
        }
        Self { members: set }
    }

    pub fn join(&self, member: MemberId) -> bool {
        self.members.insert(member)
    }

    pub fn leave(&self, member: MemberId) -> bool {
        self.members.remove(&member).is_some()
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.members.contains(&member)
    }
}

impl ChannelSource for StaticChannel {
    fn members(&self, _sender: MemberId) -> Option<BTreeSet<MemberId>> {
        Some(self.members.iter().map(|m| *m.key()).collect())
    }
}

#[derive(Default)]
pub struct ChannelRegistry {
    sources: DashMap<ChannelId, Arc<dyn ChannelSource>>,
    statics: DashMap<ChannelId, Arc<StaticChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, channel: ChannelId, source: Arc<dyn ChannelSource>) {
        self.statics.remove(&channel);
        self.sources.insert(channel, source);
    }

    pub fn register_static(
        &self,
        channel: ChannelId,
        members: impl IntoIterator<Item = MemberId>,
    ) -> Arc<StaticChannel> {
        let ch = Arc::new(StaticChannel::new(members));
        self.sources
            .insert(channel.clone(), Arc::clone(&ch) as Arc<dyn ChannelSource>);
        self.statics.insert(channel, Arc::clone(&ch));
        ch
    }

    pub fn static_channel(&self, channel: &ChannelId) -> Option<Arc<StaticChannel>> {
        self.statics.get(channel).map(|c| Arc::clone(c.value()))
    }

    pub fn resolve(&self, channel: &ChannelId, sender: MemberId) -> Option<BTreeSet<MemberId>> {
        let source = self.sources.get(channel).map(|s| Arc::clone(s.value()))?;
        source.members(sender)
    }

    pub fn channels(&self) -> Vec<ChannelId> {
        let mut out: Vec<ChannelId> = self.sources.iter().map(|e| e.key().clone()).collect();
        out.sort();
        out
    }
}
