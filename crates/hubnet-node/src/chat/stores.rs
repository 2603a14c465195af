//! Persistent chat state (blocklists, tags, name gradients) and the node-side
//! caches in front of it.
//!
//! Stores are opaque collaborators supplied by the host. The node loads every
//! value once at startup and writes through on change; other processes pick up
//! changes on their next `reload`.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use hubnet_core::error::{HubError, Result};
use hubnet_core::MemberId;

/// Two-stop colour gradient applied to a player's name, e.g. `#ff0000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gradient {
    pub from: String,
    pub to: String,
}

impl Gradient {
    /// Both stops must be `#rrggbb`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self> {
        let g = Self {
            from: from.into(),
            to: to.into(),
        };
        if !is_hex_colour(&g.from) || !is_hex_colour(&g.to) {
            return Err(HubError::BadConfig(format!(
                "gradient stops must be #rrggbb, got {} / {}",
                g.from, g.to
            )));
        }
        Ok(g)
    }

    pub fn wrap(&self, text: &str) -> String {
        format!("<gradient:{}:{}>{}</gradient>", self.from, self.to, text)
    }
}

fn is_hex_colour(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub trait BlocklistStore: Send + Sync {
    /// blocker -> ids they blocked
    fn load_blocklists(&self) -> Result<HashMap<MemberId, BTreeSet<MemberId>>>;
    fn save_blocklist(&self, blocker: MemberId, blocked: &BTreeSet<MemberId>) -> Result<()>;
}

pub trait TagStore: Send + Sync {
    fn load_tags(&self) -> Result<HashMap<MemberId, String>>;
    /// `None` clears the tag.
    fn save_tag(&self, member: MemberId, tag: Option<&str>) -> Result<()>;
}

pub trait GradientStore: Send + Sync {
    fn load_gradients(&self) -> Result<HashMap<MemberId, Gradient>>;
    fn save_gradient(&self, member: MemberId, gradient: Option<&Gradient>) -> Result<()>;
}

/// In-memory implementation of every store. Shared between node contexts in
/// tests to stand in for a database.
#[derive(Default)]
pub struct MemoryStore {
    blocklists: RwLock<HashMap<MemberId, BTreeSet<MemberId>>>,
    tags: RwLock<HashMap<MemberId, String>>,
    gradients: RwLock<HashMap<MemberId, Gradient>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlocklistStore for MemoryStore {
    fn load_blocklists(&self) -> Result<HashMap<MemberId, BTreeSet<MemberId>>> {
        Ok(self
            .blocklists
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save_blocklist(&self, blocker: MemberId, blocked: &BTreeSet<MemberId>) -> Result<()> {
        let mut map = self.blocklists.write().unwrap_or_else(|e| e.into_inner());
        if blocked.is_empty() {
            map.remove(&blocker);
        } else {
            map.insert(blocker, blocked.clone());
        }
        Ok(())
    }
}

impl TagStore for MemoryStore {
    fn load_tags(&self) -> Result<HashMap<MemberId, String>> {
        Ok(self.tags.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save_tag(&self, member: MemberId, tag: Option<&str>) -> Result<()> {
        let mut map = self.tags.write().unwrap_or_else(|e| e.into_inner());
        match tag {
            Some(t) => map.insert(member, t.to_string()),
            None => map.remove(&member),
        };
        Ok(())
    }
}

impl GradientStore for MemoryStore {
    fn load_gradients(&self) -> Result<HashMap<MemberId, Gradient>> {
        Ok(self
            .gradients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save_gradient(&self, member: MemberId, gradient: Option<&Gradient>) -> Result<()> {
        let mut map = self.gradients.write().unwrap_or_else(|e| e.into_inner());
        match gradient {
            Some(g) => map.insert(member, g.clone()),
            None => map.remove(&member),
        };
        Ok(())
    }
}

/// The three stores a node needs. Usually one object behind all of them.
#[derive(Clone)]
pub struct ChatStores {
    pub blocklists: Arc<dyn BlocklistStore>,
    pub tags: Arc<dyn TagStore>,
    pub gradients: Arc<dyn GradientStore>,
}

impl ChatStores {
    pub fn memory() -> Self {
        Self::shared(Arc::new(MemoryStore::new()))
    }

    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: BlocklistStore + TagStore + GradientStore + 'static,
    {
        Self {
            blocklists: Arc::clone(&store) as Arc<dyn BlocklistStore>,
            tags: Arc::clone(&store) as Arc<dyn TagStore>,
            gradients: store as Arc<dyn GradientStore>,
        }
    }
}

/// Cached blocklists.
pub struct Blocklists {
    store: Arc<dyn BlocklistStore>,
    by_blocker: DashMap<MemberId, BTreeSet<MemberId>>,
}

impl Blocklists {
    pub fn load(store: Arc<dyn BlocklistStore>) -> Result<Self> {
        let this = Self {
            store,
            by_blocker: DashMap::new(),
        };
        this.reload()?;
        Ok(this)
    }

    /// Replace the cache with the store's current contents.
    pub fn reload(&self) -> Result<()> {
        let fresh = self.store.load_blocklists()?;
        self.by_blocker.clear();
        for (blocker, blocked) in fresh {
            self.by_blocker.insert(blocker, blocked);
        }
        Ok(())
    }

    pub fn block(&self, blocker: MemberId, target: MemberId) -> Result<bool> {
        self.edit(blocker, |set| set.insert(target))
    }

    pub fn unblock(&self, blocker: MemberId, target: MemberId) -> Result<bool> {
        self.edit(blocker, |set| set.remove(&target))
    }

    /// The entry guard is held across the edit and the store write, so
    /// concurrent edits for one blocker apply one after the other.
    fn edit(&self, blocker: MemberId, f: impl FnOnce(&mut BTreeSet<MemberId>) -> bool) -> Result<bool> {
        match self.by_blocker.entry(blocker) {
            Entry::Occupied(mut entry) => {
                let mut set = entry.get().clone();
                if !f(&mut set) {
                    return Ok(false);
                }
                self.store.save_blocklist(blocker, &set)?;
                if set.is_empty() {
                    entry.remove();
                } else {
                    *entry.get_mut() = set;
                }
            }
            Entry::Vacant(entry) => {
                let mut set = BTreeSet::new();
                if !f(&mut set) {
                    return Ok(false);
                }
                self.store.save_blocklist(blocker, &set)?;
                if !set.is_empty() {
                    entry.insert(set);
                }
            }
        }
        Ok(true)
    }

    pub fn has_blocked(&self, blocker: MemberId, target: MemberId) -> bool {
        self.by_blocker
            .get(&blocker)
            .map(|s| s.contains(&target))
            .unwrap_or(false)
    }

    /// Everyone who has blocked `sender`.
    pub fn blockers_of(&self, sender: MemberId) -> BTreeSet<MemberId> {
        self.by_blocker
            .iter()
            .filter(|e| e.value().contains(&sender))
            .map(|e| *e.key())
            .collect()
    }
}

/// Cached tags and gradients.
pub struct Cosmetics {
    tag_store: Arc<dyn TagStore>,
    gradient_store: Arc<dyn GradientStore>,
    tags: DashMap<MemberId, String>,
    gradients: DashMap<MemberId, Gradient>,
}

impl Cosmetics {
    pub fn load(tag_store: Arc<dyn TagStore>, gradient_store: Arc<dyn GradientStore>) -> Result<Self> {
        let this = Self {
            tag_store,
            gradient_store,
            tags: DashMap::new(),
            gradients: DashMap::new(),
        };
        this.reload()?;
        Ok(this)
    }

    pub fn reload(&self) -> Result<()> {
        let tags = self.tag_store.load_tags()?;
        let gradients = self.gradient_store.load_gradients()?;
        self.tags.clear();
        for (member, tag) in tags {
            self.tags.insert(member, tag);
        }
        self.gradients.clear();
        for (member, gradient) in gradients {
            self.gradients.insert(member, gradient);
        }
        Ok(())
    }

    pub fn tag(&self, member: MemberId) -> Option<String> {
        self.tags.get(&member).map(|t| t.value().clone())
    }

    pub fn set_tag(&self, member: MemberId, tag: Option<&str>) -> Result<()> {
        self.tag_store.save_tag(member, tag)?;
        match tag {
            Some(t) => {
                self.tags.insert(member, t.to_string());
            }
            None => {
                self.tags.remove(&member);
            }
        }
        Ok(())
    }

    pub fn gradient(&self, member: MemberId) -> Option<Gradient> {
        self.gradients.get(&member).map(|g| g.value().clone())
    }

    pub fn set_gradient(&self, member: MemberId, gradient: Option<Gradient>) -> Result<()> {
        self.gradient_store.save_gradient(member, gradient.as_ref())?;
        match gradient {
            Some(g) => {
                self.gradients.insert(member, g);
            }
            None => {
                self.gradients.remove(&member);
            }
        }
        Ok(())
    }
}
