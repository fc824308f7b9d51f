//! Integration tests for identifiers and id sets
//!
//! Tests EntityId ordering and the empty sentinel, EntityIdSet membership,
//! mutations, and liveness tokens.

use lodestore_foundation::{
    EntityId, EntityIdSet, LinkId, Liveness, Mutation, PropertyId, PropertyValue,
};

// =============================================================================
// EntityId
// =============================================================================

#[test]
fn entity_ids_order_by_type_then_local() {
    let mut ids = vec![
        EntityId::new(1, 0),
        EntityId::new(0, 9),
        EntityId::new(0, 2),
    ];
    ids.sort();
    assert_eq!(
        ids,
        vec![EntityId::new(0, 2), EntityId::new(0, 9), EntityId::new(1, 0)]
    );
}

#[test]
fn empty_sentinel_is_distinct() {
    assert!(EntityId::EMPTY.is_empty());
    assert!(!EntityId::new(0, 0).is_empty());
    assert_ne!(EntityId::EMPTY, EntityId::new(0, 0));
}

// =============================================================================
// EntityIdSet
// =============================================================================

#[test]
fn id_set_membership() {
    let mut set = EntityIdSet::new();
    assert!(set.is_empty());
    assert!(set.insert(EntityId::new(2, 5)));
    assert!(!set.insert(EntityId::new(2, 5)));
    assert!(set.insert(EntityId::new(3, 5)));

    assert_eq!(set.len(), 2);
    assert!(set.contains(EntityId::new(2, 5)));
    assert!(!set.contains(EntityId::new(2, 6)));
    assert!(set.contains_type(3));
}

#[test]
fn id_set_never_holds_the_sentinel() {
    let mut set = EntityIdSet::new();
    assert!(!set.insert(EntityId::EMPTY));
    assert!(!set.contains(EntityId::EMPTY));
    assert!(set.is_empty());
}

#[test]
fn id_set_remove_drops_empty_types() {
    let mut set: EntityIdSet = [EntityId::new(1, 1)].into_iter().collect();
    assert!(set.remove(EntityId::new(1, 1)));
    assert!(!set.contains_type(1));
    assert!(set.is_empty());
}

#[test]
fn id_set_sorted_view() {
    let set: EntityIdSet = [EntityId::new(1, 0), EntityId::new(0, 3), EntityId::new(0, 1)]
        .into_iter()
        .collect();
    assert_eq!(
        set.to_sorted_vec(),
        vec![EntityId::new(0, 1), EntityId::new(0, 3), EntityId::new(1, 0)]
    );
}

// =============================================================================
// Mutations and Liveness
// =============================================================================

#[test]
fn mutation_link_accessor() {
    let added = Mutation::LinkAdded {
        source: EntityId::new(0, 0),
        target: EntityId::new(1, 0),
        link: LinkId(4),
    };
    assert_eq!(added.link(), Some(LinkId(4)));

    let changed = Mutation::PropertyChanged {
        entity_type: 0,
        property: PropertyId(1),
        old: None,
        new: Some(PropertyValue::from(3i64)),
    };
    assert_eq!(changed.link(), None);
}

#[test]
fn liveness_is_shared_between_clones() {
    let token = Liveness::new();
    let clone = token.clone();
    assert!(token.same_as(&clone));
    assert!(!token.same_as(&Liveness::new()));

    assert!(clone.expire());
    assert!(!clone.expire());
    assert!(token.is_expired());
}
