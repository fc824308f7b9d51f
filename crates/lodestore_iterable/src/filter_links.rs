//! Link-membership filter.
//!
//! `filter_links(link, source, entities)` yields the entities of `source`
//! whose `link` points at a member of `entities`. Candidates are pulled one
//! at a time; the target set is materialized from `entities` the first
//! time a candidate actually has the link, and kept for the rest of that
//! iterator's life. Source order, and with it sortedness, is preserved.
//!
//! The node is never cacheable: its result depends on the full contents of
//! `entities`, which its handle predicates do not track precisely.

use lodestore_foundation::{EntityId, EntityIdSet, LinkId, Result};
use lodestore_storage::Snapshot;
use tracing::debug;

use crate::arena::QueryArena;
use crate::cursor::EntityCursor;
use crate::iterable::{IterableId, IterableKind};

impl QueryArena {
    /// Builds a node yielding the entities of `source` whose `link` points
    /// into the set produced by `entities`.
    ///
    /// `entities` is bound in canonical form: cached-instance wrappers are
    /// stripped first, so the key does not depend on how the target set
    /// was decorated.
    ///
    /// # Errors
    ///
    /// Returns an error if the link type is not registered, either id was
    /// not issued by this arena, or the session is closed.
    pub fn filter_links(
        &mut self,
        link: LinkId,
        source: IterableId,
        entities: IterableId,
    ) -> Result<IterableId> {
        self.schema().check_link_type(link)?;
        self.node(source)?;
        let entities = self.source(entities)?;
        self.push(IterableKind::FilterLinks {
            link,
            source,
            entities,
        })
    }
}

pub(crate) struct FilterLinksCursor<'a> {
    arena: &'a QueryArena,
    source: Box<dyn EntityCursor + 'a>,
    link: LinkId,
    entities: IterableId,
    /// Target set, built on first need.
    targets: Option<EntityIdSet>,
}

impl<'a> FilterLinksCursor<'a> {
    pub(crate) fn new(
        arena: &'a QueryArena,
        source: Box<dyn EntityCursor + 'a>,
        link: LinkId,
        entities: IterableId,
    ) -> Self {
        Self {
            arena,
            source,
            link,
            entities,
            targets: None,
        }
    }

    fn is_target(&mut self, target: EntityId, snapshot: &Snapshot) -> Result<bool> {
        let targets = match self.targets.take() {
            Some(targets) => targets,
            None => {
                let targets = self.arena.to_set(self.entities, snapshot)?;
                debug!(
                    link = self.link.0,
                    size = targets.len(),
                    "filter links target set ready"
                );
                targets
            }
        };
        let hit = targets.contains(target);
        self.targets = Some(targets);
        Ok(hit)
    }
}

impl EntityCursor for FilterLinksCursor<'_> {
    fn advance(&mut self, snapshot: &Snapshot) -> Result<Option<EntityId>> {
        while let Some(candidate) = self.source.advance(snapshot)? {
            let Some(target) = snapshot.link_target(candidate, self.link)? else {
                continue;
            };
            if self.is_target(target, snapshot)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
