//! Integration tests for invalidation routing
//!
//! Tests that committed mutations reach exactly the handles whose results
//! they could change.

use std::collections::BTreeSet;
use std::sync::Arc;

use lodestore_foundation::Mutation;
use lodestore_iterable::{InvalidationIndex, QueryArena};
use lodestore_storage::{Store, StoreConfig};

fn touched(index: &InvalidationIndex, mutations: &[Mutation]) -> BTreeSet<String> {
    mutations
        .iter()
        .flat_map(|m| index.affected(m))
        .map(|h| h.string_handle().to_string())
        .collect()
}

#[test]
fn commits_invalidate_dependent_queries_only() {
    crate::init_tracing();
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();
    let user = store.register_entity_type("User").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();
    let reporter = store.register_link_type("reporter").unwrap();
    let team = store.register_property("team").unwrap();

    let mut txn = store.begin_write();
    let bug = txn.create_entity(issue).unwrap();
    let alice = txn.create_entity(user).unwrap();
    store.commit(txn).unwrap();

    let snap = store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);
    let issues = arena.all_entities(issue).unwrap();
    let core = arena.property_equals(user, team, "core").unwrap();
    let assigned = arena.filter_links(assignee, issues, core).unwrap();
    let reported = arena.entities_with_link(issue, reporter).unwrap();

    let mut index = InvalidationIndex::new();
    for id in [issues, core, assigned, reported] {
        index.register(Arc::clone(arena.handle(id).unwrap()));
    }

    // Assigning touches the filter only.
    let mut txn = store.begin_write();
    txn.set_link(bug, assignee, alice).unwrap();
    let mutations = store.commit(txn).unwrap();
    assert_eq!(
        touched(&index, &mutations),
        BTreeSet::from(["5-0-1-0-4-1-0-s4:core".to_string()])
    );

    // Joining the team touches the property node and the filter above it.
    let mut txn = store.begin_write();
    txn.set_property(alice, team, "core").unwrap();
    let mutations = store.commit(txn).unwrap();
    assert_eq!(
        touched(&index, &mutations),
        BTreeSet::from([
            "4-1-0-s4:core".to_string(),
            "5-0-1-0-4-1-0-s4:core".to_string(),
        ])
    );

    // Reporting touches the reporter scan only.
    let mut txn = store.begin_write();
    txn.set_link(bug, reporter, alice).unwrap();
    let mutations = store.commit(txn).unwrap();
    assert_eq!(
        touched(&index, &mutations),
        BTreeSet::from(["3-0-1".to_string()])
    );
}

#[test]
fn invalidated_results_match_recomputation() {
    let mut store = Store::new(StoreConfig::default());
    let issue = store.register_entity_type("Issue").unwrap();
    let user = store.register_entity_type("User").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();

    let mut txn = store.begin_write();
    let bug = txn.create_entity(issue).unwrap();
    let alice = txn.create_entity(user).unwrap();
    let bob = txn.create_entity(user).unwrap();
    txn.set_link(bug, assignee, bob).unwrap();
    store.commit(txn).unwrap();

    let snap = store.snapshot();
    let mut arena = QueryArena::for_snapshot(&snap);
    let issues = arena.all_entities(issue).unwrap();
    let just_alice = arena.single_entity(alice).unwrap();
    let hers = arena.filter_links(assignee, issues, just_alice).unwrap();
    let before = arena.to_vec(hers, &snap).unwrap();
    assert!(before.is_empty());

    let mut index = InvalidationIndex::new();
    index.register(Arc::clone(arena.handle(hers).unwrap()));

    let mut txn = store.begin_write();
    txn.set_link(bug, assignee, alice).unwrap();
    let mutations = store.commit(txn).unwrap();

    assert!(mutations.iter().any(|m| !index.affected(m).is_empty()));
    let after = arena.to_vec(hers, &store.snapshot()).unwrap();
    assert_ne!(before, after);
    assert_eq!(after, vec![bug]);
}

#[test]
fn closed_sessions_drop_out_of_the_index() {
    let store = Store::default();
    let mut arena = QueryArena::for_snapshot(&store.snapshot());
    let empty = arena.empty().unwrap();

    let mut index = InvalidationIndex::new();
    assert!(index.register(Arc::clone(arena.handle(empty).unwrap())));
    arena.close();

    assert_eq!(index.prune_expired(), 1);
    assert!(index.is_empty());
    assert!(!index.register(Arc::clone(arena.handle(empty).unwrap())));
}
