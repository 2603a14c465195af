//! Dual-index properties of the party index.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use uuid::Uuid;

use hubnet_core::{MemberId, PartyId};
use hubnet_node::party::{Applied, Member, Party, PartyIndex};
use hubnet_node::session::SessionHandle;

fn member(n: u128, name: &str) -> Member {
    Member::new(MemberId(Uuid::from_u128(n)), name)
}

fn pid(n: u128) -> PartyId {
    PartyId(Uuid::from_u128(n))
}

fn join(idx: &PartyIndex, host: &Member, joiner: &Member) -> Arc<Party> {
    let target = idx.by_member_or_create(host.id, &host.name);
    match idx.apply_join(target.id(), Some(host), joiner) {
        Applied::Changed(Some(p)) => p,
        other => panic!("join not applied: {other:?}"),
    }
}

#[test]
fn first_reference_creates_a_singleton() {
    let idx = PartyIndex::new();
    let a = member(1, "alice");
    let handle = SessionHandle {
        member: a.id,
        name: a.name.clone(),
    };

    let p = idx.party_of(&handle);
    assert_eq!(p.len(), 1);
    assert_eq!(p.id(), pid(1));
    assert!(Arc::ptr_eq(&p, &idx.party_of(&handle)));
    assert!(idx.is_consistent());
}

#[test]
fn merging_two_singletons_leaves_exactly_one_party() {
    let idx = PartyIndex::new();
    let a = member(1, "alice");
    let b = member(2, "bob");
    let pa = idx.by_member_or_create(a.id, &a.name);
    let pb = idx.by_member_or_create(b.id, &b.name);
    assert_eq!(idx.len(), 2);

    let merged = join(&idx, &a, &b);

    assert_eq!(idx.len(), 1);
    assert_eq!(merged.len(), 2);
    assert!(Arc::ptr_eq(&idx.by_member(a.id).unwrap(), &merged));
    assert!(Arc::ptr_eq(&idx.by_member(b.id).unwrap(), &merged));
    // The survivor id is the smaller of the two; the other id is gone.
    assert_eq!(merged.id(), pa.id().min(pb.id()));
    assert!(idx.by_id(pb.id()).is_none());
    assert!(idx.is_consistent());
}

#[test]
fn merge_survivor_is_the_smaller_id_regardless_of_direction() {
    let idx = PartyIndex::new();
    let small = member(3, "small");
    let big = member(9, "big");

    // Big hosts, small joins: the result still carries small's id.
    let merged = join(&idx, &big, &small);
    assert_eq!(merged.id(), pid(3));
    assert!(idx.by_id(pid(9)).is_none());
    assert!(idx.is_consistent());
}

#[test]
fn joining_absorbs_the_joiners_whole_party() {
    let idx = PartyIndex::new();
    let (a, b, c, d) = (member(1, "a"), member(2, "b"), member(3, "c"), member(4, "d"));
    join(&idx, &a, &b);
    join(&idx, &c, &d);
    assert_eq!(idx.len(), 2);

    let all = join(&idx, &a, &c);
    assert_eq!(all.len(), 4);
    assert_eq!(idx.len(), 1);
    for m in [&a, &b, &c, &d] {
        assert!(Arc::ptr_eq(&idx.by_member(m.id).unwrap(), &all));
    }
    assert!(idx.is_consistent());
}

#[test]
fn leaving_a_larger_party_removes_exactly_that_member() {
    let idx = PartyIndex::new();
    let (a, b, c) = (member(1, "a"), member(2, "b"), member(3, "c"));
    join(&idx, &a, &b);
    let before = join(&idx, &a, &c);
    assert_eq!(before.len(), 3);

    let after = match idx.apply_leave(b.id) {
        Applied::Changed(Some(p)) => p,
        other => panic!("leave not applied: {other:?}"),
    };
    assert_eq!(after.len(), 2);
    assert!(!after.contains(b.id));
    assert!(after.contains(a.id) && after.contains(c.id));
    assert!(idx.by_member(b.id).is_none());
    assert!(idx.is_consistent());
}

#[test]
fn party_id_survives_its_smallest_member_leaving() {
    let idx = PartyIndex::new();
    let (a, b) = (member(1, "a"), member(2, "b"));
    join(&idx, &a, &b);

    idx.apply_leave(a.id);
    let rest = idx.by_member(b.id).unwrap();
    assert_eq!(rest.id(), pid(1));
    assert!(idx.by_id(pid(2)).is_none());
    assert!(idx.is_consistent());
}

#[test]
fn rejoining_member_gets_a_fresh_id_and_old_id_keeps_pointing_at_the_survivors() {
    let idx = PartyIndex::new();
    let (a, b, c) = (member(1, "a"), member(2, "b"), member(3, "c"));
    join(&idx, &a, &b);
    idx.apply_leave(a.id);

    // a is referenced again while b's party still holds id 1.
    let fresh = idx.by_member_or_create(a.id, &a.name);
    assert_ne!(fresh.id(), pid(1));
    assert_eq!(fresh.len(), 1);
    assert_eq!(idx.by_id(pid(1)).unwrap().len(), 1);
    assert!(idx.by_id(pid(1)).unwrap().contains(b.id));

    // A join still addressed to id 1 lands with b, not with a.
    let merged = match idx.apply_join(pid(1), Some(&b), &c) {
        Applied::Changed(Some(p)) => p,
        other => panic!("join not applied: {other:?}"),
    };
    assert_eq!(merged.id(), pid(1));
    assert!(merged.contains(b.id) && merged.contains(c.id));
    assert!(!merged.contains(a.id));
    assert_eq!(idx.by_member(a.id).unwrap().id(), fresh.id());
    assert!(idx.is_consistent());
}

#[test]
fn fresh_singleton_ids_are_the_same_on_every_process() {
    let build = || {
        let idx = PartyIndex::new();
        let (a, b) = (member(1, "a"), member(2, "b"));
        join(&idx, &a, &b);
        idx.apply_leave(a.id);
        idx.by_member_or_create(a.id, &a.name).id()
    };
    assert_eq!(build(), build());
}

#[test]
fn join_addressed_to_a_reused_id_follows_the_host() {
    let idx = PartyIndex::new();
    let (a, b, c) = (member(1, "a"), member(2, "b"), member(3, "c"));
    let ab = join(&idx, &a, &b);
    idx.apply_disband(ab.id());

    // Id 1 now names a's new singleton; the host of the old request was b.
    idx.by_member_or_create(a.id, &a.name);
    let merged = match idx.apply_join(pid(1), Some(&b), &c) {
        Applied::Changed(Some(p)) => p,
        other => panic!("join not applied: {other:?}"),
    };
    assert!(merged.contains(b.id) && merged.contains(c.id));
    assert_eq!(idx.by_member(a.id).unwrap().len(), 1);
    assert!(idx.is_consistent());
}

#[test]
fn last_member_leaving_removes_the_party_from_both_maps() {
    let idx = PartyIndex::new();
    let a = member(1, "a");
    let p = idx.by_member_or_create(a.id, &a.name);

    assert_eq!(idx.apply_leave(a.id), Applied::Changed(None));
    assert!(idx.by_id(p.id()).is_none());
    assert!(idx.by_member(a.id).is_none());
    assert!(idx.is_empty());
    assert!(idx.is_consistent());
}

#[test]
fn stale_references_are_no_ops() {
    let idx = PartyIndex::new();
    let a = member(1, "a");
    let ghost = member(7, "ghost");

    assert_eq!(idx.apply_leave(ghost.id), Applied::Unchanged);
    assert_eq!(idx.apply_disband(pid(42)), Applied::Unchanged);
    // Unknown target and no host to fall back on.
    assert_eq!(idx.apply_join(pid(42), None, &a), Applied::Unchanged);
    assert!(idx.is_empty());
}

#[test]
fn join_falls_back_to_the_hosts_party() {
    let idx = PartyIndex::new();
    let host = member(5, "host");
    let joiner = member(6, "joiner");

    // This process has never seen the host; the join still lands.
    let merged = match idx.apply_join(pid(5), Some(&host), &joiner) {
        Applied::Changed(Some(p)) => p,
        other => panic!("join not applied: {other:?}"),
    };
    assert_eq!(merged.len(), 2);
    assert!(idx.is_consistent());
}

#[test]
fn repeated_join_is_unchanged() {
    let idx = PartyIndex::new();
    let (a, b) = (member(1, "a"), member(2, "b"));
    let p = join(&idx, &a, &b);
    assert_eq!(idx.apply_join(p.id(), Some(&a), &b), Applied::Unchanged);
}

#[test]
fn disband_unlinks_every_member() {
    let idx = PartyIndex::new();
    let (a, b, c) = (member(1, "a"), member(2, "b"), member(3, "c"));
    join(&idx, &a, &b);
    let p = join(&idx, &a, &c);

    assert_eq!(idx.apply_disband(p.id()), Applied::Changed(None));
    for m in [&a, &b, &c] {
        assert!(idx.by_member(m.id).is_none());
    }
    assert!(idx.is_empty());
    assert!(idx.is_consistent());
}

#[test]
fn update_with_a_colliding_snapshot_keeps_the_index_consistent() {
    let idx = PartyIndex::new();
    let (a, b, c) = (member(1, "a"), member(2, "b"), member(3, "c"));
    let ab = join(&idx, &a, &b);

    // Replace {a, b} by {a, c} under the same id, passing an unrelated
    // previous snapshot: b must not keep pointing at a dropped party.
    let previous = Party::singleton(c.clone());
    let updated = Party::new(ab.id(), [a.clone(), c.clone()]).unwrap();
    assert_eq!(updated.id(), ab.id());
    idx.update(&previous, Some(updated));

    assert!(idx.by_member(b.id).is_none());
    assert_eq!(idx.by_member(c.id).unwrap().id(), ab.id());
    assert!(idx.is_consistent());
}

#[test]
fn invariant_holds_after_every_step_of_a_long_sequence() {
    let idx = PartyIndex::new();
    let people: Vec<Member> = (1..=12).map(|n| member(n, &format!("p{n}"))).collect();

    // Deterministic mix of joins, leaves and disbands.
    for step in 0..200usize {
        let x = &people[(step * 7) % people.len()];
        let y = &people[(step * 5 + 3) % people.len()];
        match step % 5 {
            0 | 1 | 2 => {
                let host = idx.by_member_or_create(x.id, &x.name);
                idx.apply_join(host.id(), Some(x), y);
            }
            3 => {
                let before = idx.by_member(y.id);
                if let Applied::Changed(Some(after)) = idx.apply_leave(y.id) {
                    assert_eq!(Some(after.id()), before.map(|p| p.id()));
                }
            }
            _ => {
                if let Some(p) = idx.by_member(x.id) {
                    idx.apply_disband(p.id());
                }
            }
        }
        assert!(idx.is_consistent(), "broken after step {step}");
        let mut seen = 0;
        for p in idx.parties() {
            assert!(!p.is_empty());
            seen += p.len();
        }
        // Every member sits in at most one party.
        assert_eq!(seen, people.iter().filter(|m| idx.by_member(m.id).is_some()).count());
    }
}

#[test]
fn concurrent_joins_and_leaves_keep_the_index_consistent() {
    let idx = Arc::new(PartyIndex::new());
    let people: Arc<Vec<Member>> = Arc::new((1..=16).map(|n| member(n, &format!("p{n}"))).collect());

    std::thread::scope(|scope| {
        for t in 0..4usize {
            let idx = Arc::clone(&idx);
            let people = Arc::clone(&people);
            scope.spawn(move || {
                for step in 0..500usize {
                    let x = &people[(step * 3 + t) % people.len()];
                    let y = &people[(step * 7 + t * 5 + 1) % people.len()];
                    if (step + t) % 3 == 0 {
                        idx.apply_leave(y.id);
                    } else {
                        let host = idx.by_member_or_create(x.id, &x.name);
                        idx.apply_join(host.id(), Some(x), y);
                    }
                }
            });
        }
    });

    assert!(idx.is_consistent());
    let total: usize = idx.parties().iter().map(|p| p.len()).sum();
    assert_eq!(total, people.iter().filter(|m| idx.by_member(m.id).is_some()).count());
}
