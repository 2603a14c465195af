//! Blocklist and cosmetics caches in front of a shared store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use uuid::Uuid;

use hubnet_core::MemberId;
use hubnet_node::chat::{BlocklistStore, Blocklists, Cosmetics, Gradient, MemoryStore};

fn id(n: u128) -> MemberId {
    MemberId(Uuid::from_u128(n))
}

#[test]
fn concurrent_blocks_by_one_player_are_all_kept() {
    let store = Arc::new(MemoryStore::new());
    let blocklists = Arc::new(Blocklists::load(store.clone()).unwrap());
    let blocker = id(1);

    std::thread::scope(|scope| {
        for t in 0..8u128 {
            let blocklists = Arc::clone(&blocklists);
            scope.spawn(move || {
                for n in 0..25u128 {
                    blocklists.block(blocker, id(100 + t * 25 + n)).unwrap();
                }
            });
        }
    });

    for n in 0..200u128 {
        assert!(blocklists.has_blocked(blocker, id(100 + n)), "lost block of {n}");
    }
    let saved = store.load_blocklists().unwrap();
    assert_eq!(saved.get(&blocker).map(|s| s.len()), Some(200));
}

#[test]
fn unblocking_the_last_entry_clears_cache_and_store() {
    let store = Arc::new(MemoryStore::new());
    let blocklists = Blocklists::load(store.clone()).unwrap();

    assert!(blocklists.block(id(1), id(2)).unwrap());
    assert!(!blocklists.block(id(1), id(2)).unwrap());
    assert!(blocklists.unblock(id(1), id(2)).unwrap());
    assert!(!blocklists.unblock(id(1), id(2)).unwrap());

    assert!(blocklists.blockers_of(id(2)).is_empty());
    assert!(store.load_blocklists().unwrap().is_empty());
}

#[test]
fn cosmetics_reload_picks_up_changes_made_elsewhere() {
    let store = Arc::new(MemoryStore::new());
    let here = Cosmetics::load(store.clone(), store.clone()).unwrap();
    let there = Cosmetics::load(store.clone(), store.clone()).unwrap();
    let gradient = Gradient::new("#ff0000", "#0000ff").unwrap();

    there.set_tag(id(1), Some("VIP")).unwrap();
    there.set_gradient(id(1), Some(gradient.clone())).unwrap();
    assert_eq!(here.tag(id(1)), None);

    here.reload().unwrap();
    assert_eq!(here.tag(id(1)).as_deref(), Some("VIP"));
    assert_eq!(here.gradient(id(1)), Some(gradient));

    there.set_tag(id(1), None).unwrap();
    here.reload().unwrap();
    assert_eq!(here.tag(id(1)), None);
}
