//! Entity identifiers keyed by entity type and local id.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a stored entity.
///
/// Entities are numbered per type: `local_id` is unique only within
/// `type_id`. Identifiers are totally ordered by `(type_id, local_id)`,
/// which is the order every sorted iterable produces.
///
/// # Layout
/// - `type_id`: 32-bit registered entity type
/// - `local_id`: 64-bit id within the type
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId {
    /// Registered entity type.
    pub type_id: u32,
    /// Id within the entity type.
    pub local_id: u64,
}

impl EntityId {
    /// Sentinel marking "no current value" in iterators.
    ///
    /// Never allocated by the store and never a valid lookup key.
    pub const EMPTY: EntityId = EntityId {
        type_id: u32::MAX,
        local_id: u64::MAX,
    };

    /// Creates a new entity ID.
    #[must_use]
    pub const fn new(type_id: u32, local_id: u64) -> Self {
        Self { type_id, local_id }
    }

    /// Returns true if this is the [`EntityId::EMPTY`] sentinel.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.type_id == u32::MAX && self.local_id == u64::MAX
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "EntityId(empty)")
        } else {
            write!(f, "EntityId({}:{})", self.type_id, self.local_id)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Entity(empty)")
        } else {
            write!(f, "Entity({}:{})", self.type_id, self.local_id)
        }
    }
}
