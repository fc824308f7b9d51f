//! Integration tests for the store and write transactions
//!
//! Tests schema registration, commits, the mutations they report, and
//! write conflicts.

use lodestore_foundation::{EntityId, ErrorKind, LinkId, Mutation, PropertyValue};
use lodestore_storage::Store;

// =============================================================================
// Schema Registration
// =============================================================================

#[test]
fn register_and_look_up_names() {
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();
    let state = store.register_property("state").unwrap();

    let schema = store.schema();
    assert_eq!(schema.entity_type("Issue"), Some(issue));
    assert_eq!(schema.link_type_name(assignee), Some("assignee"));
    assert_eq!(schema.property("state"), Some(state));
    assert_eq!(schema.entity_type("User"), None);
}

#[test]
fn duplicate_names_are_rejected() {
    let mut store = Store::default();
    store.register_link_type("assignee").unwrap();
    let err = store.register_link_type("assignee").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateName(ref name) if name.contains("assignee")));
}

#[test]
fn registration_does_not_bump_version() {
    let mut store = Store::default();
    store.register_entity_type("Issue").unwrap();
    assert_eq!(store.version(), 0);
}

// =============================================================================
// Commits
// =============================================================================

#[test]
fn commit_reports_mutations_in_order() {
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();
    let user = store.register_entity_type("User").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();
    let state = store.register_property("state").unwrap();

    let mut txn = store.begin_write();
    let bug = txn.create_entity(issue).unwrap();
    let alice = txn.create_entity(user).unwrap();
    txn.set_link(bug, assignee, alice).unwrap();
    txn.set_property(bug, state, "open").unwrap();
    let mutations = store.commit(txn).unwrap();

    assert_eq!(
        mutations,
        vec![
            Mutation::EntityAdded(bug),
            Mutation::EntityAdded(alice),
            Mutation::LinkAdded {
                source: bug,
                target: alice,
                link: assignee,
            },
            Mutation::PropertyChanged {
                entity_type: issue,
                property: state,
                old: None,
                new: Some(PropertyValue::from("open")),
            },
        ]
    );
    assert_eq!(store.version(), 1);
}

#[test]
fn replacing_a_link_reports_delete_then_add() {
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();
    let user = store.register_entity_type("User").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();

    let mut txn = store.begin_write();
    let bug = txn.create_entity(issue).unwrap();
    let alice = txn.create_entity(user).unwrap();
    let bob = txn.create_entity(user).unwrap();
    txn.set_link(bug, assignee, alice).unwrap();
    store.commit(txn).unwrap();

    let mut txn = store.begin_write();
    txn.set_link(bug, assignee, bob).unwrap();
    txn.set_link(bug, assignee, bob).unwrap();
    let mutations = store.commit(txn).unwrap();

    assert_eq!(
        mutations,
        vec![
            Mutation::LinkDeleted {
                source: bug,
                target: alice,
                link: assignee,
            },
            Mutation::LinkAdded {
                source: bug,
                target: bob,
                link: assignee,
            },
        ]
    );
    assert_eq!(store.snapshot().link_target(bug, assignee).unwrap(), Some(bob));
}

#[test]
fn deleting_a_target_removes_incoming_links() {
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();
    let user = store.register_entity_type("User").unwrap();
    let assignee = store.register_link_type("assignee").unwrap();

    let mut txn = store.begin_write();
    let bug = txn.create_entity(issue).unwrap();
    let alice = txn.create_entity(user).unwrap();
    txn.set_link(bug, assignee, alice).unwrap();
    store.commit(txn).unwrap();

    let mut txn = store.begin_write();
    txn.delete_entity(alice).unwrap();
    let mutations = store.commit(txn).unwrap();

    assert_eq!(
        mutations,
        vec![
            Mutation::LinkDeleted {
                source: bug,
                target: alice,
                link: assignee,
            },
            Mutation::EntityDeleted(alice),
        ]
    );
    let snap = store.snapshot();
    assert_eq!(snap.link_target(bug, assignee).unwrap(), None);
    assert!(!snap.contains(alice).unwrap());
}

#[test]
fn empty_transaction_publishes_nothing() {
    let mut store = Store::default();
    let txn = store.begin_write();
    assert!(store.commit(txn).unwrap().is_empty());
    assert_eq!(store.version(), 0);
}

#[test]
fn stale_transaction_conflicts() {
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();

    let mut first = store.begin_write();
    let mut second = store.begin_write();
    first.create_entity(issue).unwrap();
    second.create_entity(issue).unwrap();

    store.commit(first).unwrap();
    let err = store.commit(second).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::WriteConflict {
            base: 0,
            current: 1
        }
    ));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn writes_validate_ids() {
    let mut store = Store::default();
    let issue = store.register_entity_type("Issue").unwrap();
    let mut txn = store.begin_write();
    let bug = txn.create_entity(issue).unwrap();

    let err = txn.create_entity(7).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownEntityType(7)));

    let err = txn.set_link(bug, LinkId(0), bug).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownLinkType(_)));

    let err = txn.delete_entity(EntityId::EMPTY).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EmptyEntityId));

    let err = txn.delete_entity(EntityId::new(issue, 40)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
}
