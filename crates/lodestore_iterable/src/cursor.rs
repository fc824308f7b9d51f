//! Pull cursors behind [`EntityIterator`](crate::EntityIterator).
//!
//! A cursor is the per-iterator state of one node. The snapshot is passed
//! to every `advance` call by the owning iterator, so a cursor tree can
//! only ever read through the view its iterator was opened with.

use std::sync::Arc;

use lodestore_foundation::{EntityId, LinkId, PropertyId, PropertyValue, Result};
use lodestore_storage::Snapshot;

/// One step of lazy evaluation.
pub(crate) trait EntityCursor: Send {
    /// Returns the next id, or `None` once the sequence is exhausted.
    ///
    /// Never returns [`EntityId::EMPTY`].
    fn advance(&mut self, snapshot: &Snapshot) -> Result<Option<EntityId>>;
}

/// Yields nothing.
pub(crate) struct EmptyCursor;

impl EntityCursor for EmptyCursor {
    fn advance(&mut self, _snapshot: &Snapshot) -> Result<Option<EntityId>> {
        Ok(None)
    }
}

/// Per-entity condition of a type scan.
pub(crate) enum ScanFilter {
    All,
    HasLink(LinkId),
    PropertyEquals(PropertyId, PropertyValue),
}

impl ScanFilter {
    fn accepts(&self, snapshot: &Snapshot, id: EntityId) -> Result<bool> {
        Ok(match self {
            Self::All => true,
            Self::HasLink(link) => snapshot.link_target(id, *link)?.is_some(),
            Self::PropertyEquals(property, value) => {
                snapshot.property(id, *property)?.as_ref() == Some(value)
            }
        })
    }
}

/// Ordered scan over the entities of one type.
///
/// Holds only the last local id it returned, not a borrow of the
/// snapshot's tables.
pub(crate) struct TypeScanCursor {
    entity_type: u32,
    filter: ScanFilter,
    after: Option<u64>,
    done: bool,
}

impl TypeScanCursor {
    pub(crate) fn new(entity_type: u32, filter: ScanFilter) -> Self {
        Self {
            entity_type,
            filter,
            after: None,
            done: false,
        }
    }
}

impl EntityCursor for TypeScanCursor {
    fn advance(&mut self, snapshot: &Snapshot) -> Result<Option<EntityId>> {
        while !self.done {
            let Some(id) = snapshot.next_of_type(self.entity_type, self.after)? else {
                self.done = true;
                break;
            };
            self.after = Some(id.local_id);
            if self.filter.accepts(snapshot, id)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

/// Yields one entity if it exists in the snapshot.
pub(crate) struct SingleCursor {
    id: EntityId,
    done: bool,
}

impl SingleCursor {
    pub(crate) fn new(id: EntityId) -> Self {
        Self { id, done: false }
    }
}

impl EntityCursor for SingleCursor {
    fn advance(&mut self, snapshot: &Snapshot) -> Result<Option<EntityId>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(snapshot.contains(self.id)?.then_some(self.id))
    }
}

/// Replays ids captured earlier at the same snapshot version.
pub(crate) struct IdsCursor {
    ids: Arc<[EntityId]>,
    pos: usize,
}

impl IdsCursor {
    pub(crate) fn new(ids: Arc<[EntityId]>) -> Self {
        Self { ids, pos: 0 }
    }
}

impl EntityCursor for IdsCursor {
    fn advance(&mut self, snapshot: &Snapshot) -> Result<Option<EntityId>> {
        snapshot.ensure_live()?;
        let next = self.ids.get(self.pos).copied();
        if next.is_some() {
            self.pos += 1;
        }
        Ok(next)
    }
}
