//! Membership-testable sets of entity identifiers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::iter::FromIterator;

use crate::entity::EntityId;

/// A set of [`EntityId`]s with O(1) membership test and insertion.
///
/// Ids are bucketed by entity type, so a probe for a type that never
/// appeared is a single map miss. Membership is total: every id is either
/// a member or not. The [`EntityId::EMPTY`] sentinel is never a member.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EntityIdSet {
    by_type: HashMap<u32, HashSet<u64>>,
    len: usize,
}

impl EntityIdSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an id. Returns true if it was not already present.
    ///
    /// Inserting the sentinel is ignored and returns false.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if id.is_empty() {
            return false;
        }
        let inserted = self
            .by_type
            .entry(id.type_id)
            .or_default()
            .insert(id.local_id);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Returns true if the id is a member.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        !id.is_empty()
            && self
                .by_type
                .get(&id.type_id)
                .is_some_and(|locals| locals.contains(&id.local_id))
    }

    /// Removes an id. Returns true if it was present.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let removed = self
            .by_type
            .get_mut(&id.type_id)
            .is_some_and(|locals| locals.remove(&id.local_id));
        if removed {
            self.len -= 1;
            if self.by_type.get(&id.type_id).is_some_and(HashSet::is_empty) {
                self.by_type.remove(&id.type_id);
            }
        }
        removed
    }

    /// Returns the number of ids in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the set holds no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if any member has the given entity type.
    #[must_use]
    pub fn contains_type(&self, type_id: u32) -> bool {
        self.by_type.contains_key(&type_id)
    }

    /// Iterates over the members in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.by_type.iter().flat_map(|(type_id, locals)| {
            locals
                .iter()
                .map(move |local_id| EntityId::new(*type_id, *local_id))
        })
    }

    /// Returns the members sorted by id.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.iter().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for EntityIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_sorted_vec()).finish()
    }
}

impl FromIterator<EntityId> for EntityIdSet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<EntityId> for EntityIdSet {
    fn extend<I: IntoIterator<Item = EntityId>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}
