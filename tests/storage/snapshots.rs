//! Integration tests for snapshots
//!
//! Tests point-in-time isolation, ordered scans, and version retirement.

use lodestore_foundation::{EntityId, ErrorKind};
use lodestore_storage::{Store, StoreConfig};

fn store_with_issues(config: StoreConfig, n: usize) -> (Store, u32, Vec<EntityId>) {
    let mut store = Store::new(config);
    let issue = store.register_entity_type("Issue").unwrap();
    let mut txn = store.begin_write();
    let ids = (0..n).map(|_| txn.create_entity(issue).unwrap()).collect();
    store.commit(txn).unwrap();
    (store, issue, ids)
}

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn snapshot_does_not_see_later_commits() {
    let (mut store, issue, ids) = store_with_issues(StoreConfig::default(), 2);
    let before = store.snapshot();

    let mut txn = store.begin_write();
    txn.delete_entity(ids[0]).unwrap();
    let added = txn.create_entity(issue).unwrap();
    store.commit(txn).unwrap();

    assert!(before.contains(ids[0]).unwrap());
    assert!(!before.contains(added).unwrap());
    assert_eq!(before.entity_count(issue).unwrap(), 2);

    let after = store.snapshot();
    assert!(!after.contains(ids[0]).unwrap());
    assert!(after.contains(added).unwrap());
    assert_eq!(after.version(), before.version() + 1);
}

#[test]
fn scan_walks_a_type_in_id_order() {
    let (store, issue, ids) = store_with_issues(StoreConfig::default(), 4);
    let snap = store.snapshot();

    let mut seen = Vec::new();
    let mut after = None;
    while let Some(id) = snap.next_of_type(issue, after).unwrap() {
        seen.push(id);
        after = Some(id.local_id);
    }
    assert_eq!(seen, ids);
}

#[test]
fn reads_reject_the_empty_sentinel() {
    let (store, _, _) = store_with_issues(StoreConfig::default(), 1);
    let err = store.snapshot().contains(EntityId::EMPTY).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EmptyEntityId));
}

// =============================================================================
// Retirement
// =============================================================================

#[test]
fn old_versions_expire_past_retention() {
    let (mut store, issue, _) = store_with_issues(StoreConfig::new().with_retained_versions(1), 1);
    let v1 = store.snapshot();

    let mut txn = store.begin_write();
    txn.create_entity(issue).unwrap();
    store.commit(txn).unwrap();
    let v2 = store.snapshot();
    assert!(!v1.is_expired());

    let mut txn = store.begin_write();
    txn.create_entity(issue).unwrap();
    store.commit(txn).unwrap();

    assert!(v1.is_expired());
    assert!(!v2.is_expired());
    let err = v1.entity_count(issue).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SnapshotExpired { version: 1 }));
    assert!(err.is_expired());
}

#[test]
fn latest_only_expires_on_every_commit() {
    let (mut store, issue, _) = store_with_issues(StoreConfig::latest_only(), 1);
    let v1 = store.snapshot();

    let mut txn = store.begin_write();
    txn.create_entity(issue).unwrap();
    store.commit(txn).unwrap();

    assert!(v1.is_expired());
    assert_eq!(store.retained_versions(), 0);
}

#[test]
fn release_history_expires_everything_but_current() {
    let (mut store, issue, _) = store_with_issues(StoreConfig::default(), 1);
    let v1 = store.snapshot();
    let mut txn = store.begin_write();
    txn.create_entity(issue).unwrap();
    store.commit(txn).unwrap();

    store.release_history();
    assert!(v1.is_expired());
    assert!(!store.snapshot().is_expired());
}
