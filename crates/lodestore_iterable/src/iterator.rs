//! Iterators over arena nodes.

use std::fmt;

use lodestore_foundation::{EntityId, Error, ErrorKind, Liveness, Result};
use lodestore_storage::Snapshot;

use crate::cursor::{EmptyCursor, EntityCursor};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Active,
    Exhausted,
    Disposed,
}

/// A pull iterator over one node, bound to one snapshot.
///
/// Every lookup made while advancing reads through the snapshot the
/// iterator was opened with, even if the store has moved on. The iterator
/// is single use: once exhausted it keeps returning `None`, and once
/// disposed (explicitly or by an error) advancing is rejected.
pub struct EntityIterator<'a> {
    cursor: Box<dyn EntityCursor + 'a>,
    snapshot: Snapshot,
    session: Liveness,
    /// Look-ahead slot. `EMPTY` means "not computed yet".
    next: EntityId,
    state: State,
}

impl<'a> EntityIterator<'a> {
    pub(crate) fn new(
        cursor: Box<dyn EntityCursor + 'a>,
        snapshot: Snapshot,
        session: Liveness,
    ) -> Self {
        Self {
            cursor,
            snapshot,
            session,
            next: EntityId::EMPTY,
            state: State::Active,
        }
    }

    /// Returns the snapshot this iterator reads through.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns true if another id is available.
    ///
    /// Always false once exhausted or disposed.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error, after which the iterator is
    /// disposed. Fails with `SessionClosed` if the arena was closed.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.state != State::Active {
            return Ok(false);
        }
        if !self.next.is_empty() {
            return Ok(true);
        }
        if self.session.is_expired() {
            self.release(State::Disposed);
            return Err(Error::new(ErrorKind::SessionClosed));
        }

        match self.cursor.advance(&self.snapshot) {
            Ok(Some(id)) if id.is_empty() => {
                self.release(State::Disposed);
                Err(Error::internal("cursor yielded the empty entity id"))
            }
            Ok(Some(id)) => {
                self.next = id;
                Ok(true)
            }
            Ok(None) => {
                self.release(State::Exhausted);
                Ok(false)
            }
            Err(e) => {
                self.release(State::Disposed);
                Err(e)
            }
        }
    }

    /// Returns the next id, or `None` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns `IteratorDisposed` after [`EntityIterator::dispose`] or a
    /// previous error, otherwise the same errors as
    /// [`EntityIterator::has_next`].
    pub fn next_id(&mut self) -> Result<Option<EntityId>> {
        if self.state == State::Disposed {
            return Err(Error::new(ErrorKind::IteratorDisposed));
        }
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(&mut self.next, EntityId::EMPTY)))
    }

    /// Disposes the iterator, releasing its cursor state.
    ///
    /// Returns true if this call disposed it.
    pub fn dispose(&mut self) -> bool {
        if self.state == State::Disposed {
            return false;
        }
        self.release(State::Disposed);
        true
    }

    /// Returns true once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state == State::Disposed
    }

    /// Returns true once the underlying sequence has ended.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    fn release(&mut self, state: State) {
        self.state = state;
        self.next = EntityId::EMPTY;
        self.cursor = Box::new(EmptyCursor);
    }
}

impl Iterator for EntityIterator<'_> {
    type Item = Result<EntityId>;

    /// Yields ids, then `None`. An error is yielded once and ends the
    /// sequence.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Disposed {
            return None;
        }
        self.next_id().transpose()
    }
}

impl std::iter::FusedIterator for EntityIterator<'_> {}

impl fmt::Debug for EntityIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityIterator")
            .field("version", &self.snapshot.version())
            .field("next", &self.next)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
