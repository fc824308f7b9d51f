//! Integration tests for link filtering
//!
//! Tests filter semantics, snapshot binding, iterator discipline, and
//! concurrent iteration.

use std::thread;

use lodestore_foundation::{EntityId, ErrorKind, LinkId, PropertyId};
use lodestore_iterable::{IterableId, IterationConfig, QueryArena};
use lodestore_storage::{Snapshot, Store, StoreConfig};

/// E1 -> T1, E2 -> T3, E3 -> T2; T1 and T2 are on team "core".
struct Tracker {
    store: Store,
    issue: u32,
    user: u32,
    assignee: LinkId,
    team: PropertyId,
    e: [EntityId; 3],
    t: [EntityId; 3],
}

fn tracker(config: StoreConfig) -> Tracker {
    crate::init_tracing();
    let mut store = Store::new(config);
    let issue = store.register_entity_type("Issue").unwrap();
    let user = store.register_entity_type("User").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();
    let team = store.register_property("team").unwrap();

    let mut txn = store.begin_write();
    let e = [(); 3].map(|()| txn.create_entity(issue).unwrap());
    let t = [(); 3].map(|()| txn.create_entity(user).unwrap());
    txn.set_link(e[0], assignee, t[0]).unwrap();
    txn.set_link(e[1], assignee, t[2]).unwrap();
    txn.set_link(e[2], assignee, t[1]).unwrap();
    txn.set_property(t[0], team, "core").unwrap();
    txn.set_property(t[1], team, "core").unwrap();
    store.commit(txn).unwrap();

    Tracker {
        store,
        issue,
        user,
        assignee,
        team,
        e,
        t,
    }
}

fn core_filter(tr: &Tracker, arena: &mut QueryArena) -> IterableId {
    let source = arena.all_entities(tr.issue).unwrap();
    let core = arena.property_equals(tr.user, tr.team, "core").unwrap();
    arena.filter_links(tr.assignee, source, core).unwrap()
}

// =============================================================================
// Filter Semantics
// =============================================================================

#[test]
fn single_target_selects_one_issue() {
    let tr = tracker(StoreConfig::default());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);

    let source = arena.all_entities(tr.issue).unwrap();
    let t1 = arena.single_entity(tr.t[0]).unwrap();
    let filter = arena.filter_links(tr.assignee, source, t1).unwrap();

    assert_eq!(arena.to_vec(filter, &snap).unwrap(), vec![tr.e[0]]);
}

#[test]
fn two_targets_select_in_source_order() {
    let tr = tracker(StoreConfig::default());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);
    let filter = core_filter(&tr, &mut arena);

    assert_eq!(arena.to_vec(filter, &snap).unwrap(), vec![tr.e[0], tr.e[2]]);
}

#[test]
fn everyone_as_targets_keeps_every_linked_issue() {
    let tr = tracker(StoreConfig::default());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);

    let source = arena.all_entities(tr.issue).unwrap();
    let everyone = arena.all_entities(tr.user).unwrap();
    let filter = arena.filter_links(tr.assignee, source, everyone).unwrap();

    assert_eq!(arena.to_vec(filter, &snap).unwrap(), tr.e.to_vec());
}

#[test]
fn nested_filters_compose() {
    let mut tr = tracker(StoreConfig::default());
    let reviewer = tr.store.register_link_type("reviewer").unwrap();
    let mut txn = tr.store.begin_write();
    txn.set_link(tr.e[0], reviewer, tr.t[2]).unwrap();
    txn.set_link(tr.e[2], reviewer, tr.t[0]).unwrap();
    tr.store.commit(txn).unwrap();
    let snap = tr.store.snapshot();

    let mut arena = QueryArena::for_snapshot(&snap);
    let core_assigned = core_filter(&tr, &mut arena);
    let t1 = arena.single_entity(tr.t[0]).unwrap();
    let reviewed_by_t1 = arena.filter_links(reviewer, core_assigned, t1).unwrap();

    assert_eq!(arena.to_vec(reviewed_by_t1, &snap).unwrap(), vec![tr.e[2]]);
    assert!(arena.is_sorted_by_id(reviewed_by_t1).unwrap());
}

// =============================================================================
// Snapshot Binding
// =============================================================================

#[test]
fn reiteration_is_deterministic() {
    let tr = tracker(StoreConfig::default());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);
    let filter = core_filter(&tr, &mut arena);

    let first: Vec<EntityId> = arena
        .iterator(filter, &snap)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let second: Vec<EntityId> = arena
        .iterator(filter, &snap)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn open_iterator_ignores_later_commits() {
    let mut tr = tracker(StoreConfig::default());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);
    let filter = core_filter(&tr, &mut arena);
    let mut iter = arena.iterator(filter, &snap).unwrap();
    assert_eq!(iter.next_id().unwrap(), Some(tr.e[0]));

    let mut txn = tr.store.begin_write();
    txn.delete_entity(tr.e[2]).unwrap();
    tr.store.commit(txn).unwrap();

    assert_eq!(iter.next_id().unwrap(), Some(tr.e[2]));
    assert_eq!(iter.next_id().unwrap(), None);
    assert_eq!(iter.snapshot().version(), snap.version());
}

#[test]
fn retired_snapshot_fails_fast() {
    let mut tr = tracker(StoreConfig::latest_only());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);
    let filter = core_filter(&tr, &mut arena);
    let mut iter = arena.iterator(filter, &snap).unwrap();

    let mut txn = tr.store.begin_write();
    txn.create_entity(tr.issue).unwrap();
    tr.store.commit(txn).unwrap();

    let err = iter.next_id().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SnapshotExpired { .. }));
    let err = iter.next_id().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IteratorDisposed));
    assert!(arena.iterator(filter, &snap).unwrap_err().is_expired());
}

#[test]
fn materialization_limit_fails_the_pull() {
    let tr = tracker(StoreConfig::default());
    let snap = tr.store.snapshot();
    let mut arena = QueryArena::with_config(
        std::sync::Arc::clone(snap.schema()),
        IterationConfig::bounded(1),
    );
    let filter = core_filter(&tr, &mut arena);

    let mut iter = arena.iterator(filter, &snap).unwrap();
    let err = iter.next_id().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::LimitExceeded(_)));
    assert!(iter.is_disposed());
}

// =============================================================================
// Concurrency
// =============================================================================

fn drain(arena: &QueryArena, id: IterableId, snap: &Snapshot) -> Vec<EntityId> {
    arena
        .iterator(id, snap)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn iterators_run_concurrently_over_one_arena() {
    let mut tr = tracker(StoreConfig::default());
    let old = tr.store.snapshot();
    let mut txn = tr.store.begin_write();
    txn.set_link(tr.e[1], tr.assignee, tr.t[1]).unwrap();
    tr.store.commit(txn).unwrap();
    let new = tr.store.snapshot();

    let mut arena = QueryArena::for_snapshot(&new);
    let filter = core_filter(&tr, &mut arena);
    let arena = &arena;

    thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let snap = if i % 2 == 0 { old.clone() } else { new.clone() };
                s.spawn(move || (i, drain(arena, filter, &snap)))
            })
            .collect();
        for handle in handles {
            let (i, ids) = handle.join().unwrap();
            if i % 2 == 0 {
                assert_eq!(ids, vec![tr.e[0], tr.e[2]]);
            } else {
                assert_eq!(ids, tr.e.to_vec());
            }
        }
    });
}
