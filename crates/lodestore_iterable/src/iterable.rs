//! Iterable nodes stored in a query arena.

use std::fmt;
use std::sync::Arc;

use lodestore_foundation::{EntityId, LinkId, Liveness, PropertyId, PropertyValue};

use crate::handle::EntityIterableHandle;
use crate::iterable_type::IterableType;

/// Index of a node in a [`QueryArena`](crate::QueryArena).
///
/// Only meaningful for the arena that returned it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IterableId(pub(crate) u32);

impl IterableId {
    /// Returns the raw arena index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for IterableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IterableId({})", self.0)
    }
}

/// What a node computes.
///
/// Decorators refer to their source by arena index; the DAG only points
/// from decorator to source, so it cannot contain cycles.
#[derive(Clone, Debug)]
pub enum IterableKind {
    /// Yields nothing.
    Empty,
    /// All entities of one type, in id order.
    AllEntities {
        /// Entity type to scan.
        entity_type: u32,
    },
    /// A single entity, yielded only if it exists in the snapshot.
    SingleEntity {
        /// The entity.
        id: EntityId,
    },
    /// Entities of one type that have `link` set, in id order.
    EntitiesWithLink {
        /// Entity type to scan.
        entity_type: u32,
        /// Link type that must be present.
        link: LinkId,
    },
    /// Entities of one type whose `property` equals `value`, in id order.
    PropertyEquals {
        /// Entity type to scan.
        entity_type: u32,
        /// Property to compare.
        property: PropertyId,
        /// Required value.
        value: PropertyValue,
    },
    /// Entities of `source` whose `link` points into the set `entities`.
    FilterLinks {
        /// Link type to follow.
        link: LinkId,
        /// Candidates.
        source: IterableId,
        /// Target set, in canonical (undecorated) form.
        entities: IterableId,
    },
    /// The result of `source` captured at one snapshot version.
    CachedInstance {
        /// The iterable that was materialized.
        source: IterableId,
        /// Its result at `version`, in iteration order.
        ids: Arc<[EntityId]>,
        /// Store version the ids were read at.
        version: u64,
        /// Expiry token of that version.
        liveness: Liveness,
    },
}

impl IterableKind {
    /// Returns the type tag of this kind.
    #[must_use]
    pub fn iterable_type(&self) -> IterableType {
        match self {
            Self::Empty => IterableType::Empty,
            Self::AllEntities { .. } => IterableType::AllEntities,
            Self::SingleEntity { .. } => IterableType::SingleEntity,
            Self::EntitiesWithLink { .. } => IterableType::EntitiesWithLink,
            Self::PropertyEquals { .. } => IterableType::PropertyEquals,
            Self::FilterLinks { .. } => IterableType::FilterLinks,
            Self::CachedInstance { .. } => IterableType::CachedInstance,
        }
    }

    /// Returns the wrapped source for decorators.
    #[must_use]
    pub fn decorated(&self) -> Option<IterableId> {
        match self {
            Self::FilterLinks { source, .. } | Self::CachedInstance { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// A node of the query DAG: what it computes plus facts fixed at
/// construction.
#[derive(Clone, Debug)]
pub struct IterableNode {
    pub(crate) kind: IterableKind,
    pub(crate) handle: Arc<EntityIterableHandle>,
    pub(crate) sorted_by_id: bool,
    pub(crate) cacheable: bool,
    pub(crate) depth: usize,
}

impl IterableNode {
    /// Returns what this node computes.
    #[must_use]
    pub fn kind(&self) -> &IterableKind {
        &self.kind
    }

    /// Returns this node's handle.
    #[must_use]
    pub fn handle(&self) -> &Arc<EntityIterableHandle> {
        &self.handle
    }

    /// Returns true if the produced sequence is strictly increasing by id.
    #[must_use]
    pub fn is_sorted_by_id(&self) -> bool {
        self.sorted_by_id
    }

    /// Returns true if the result is fully determined by the handle and the
    /// snapshot, so it may be cached under the handle's key.
    #[must_use]
    pub fn can_be_cached(&self) -> bool {
        self.cacheable
    }

    /// Returns the nesting depth of this node; leaves have depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}
