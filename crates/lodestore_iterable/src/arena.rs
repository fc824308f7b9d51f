//! The query arena: an append-only DAG of iterable nodes.
//!
//! Nodes are created through the constructors on [`QueryArena`] and
//! addressed by [`IterableId`]. Construction validates ids against the
//! schema, builds the node's [`EntityIterableHandle`] bottom-up from its
//! children's handles, and fixes the node's sortedness and cacheability.
//! With deduplication enabled, constructing a node whose key already
//! exists returns the existing id.
//!
//! The arena is immutable while iterating: every [`EntityIterator`] it
//! hands out borrows it shared and owns its own cursor state, so any
//! number of iterators over the same nodes may run on different threads.

use std::collections::HashMap;
use std::sync::Arc;

use lodestore_foundation::{
    EntityId, EntityIdSet, Error, ErrorContext, ErrorKind, LinkId, Liveness, PropertyId,
    PropertyValue, Result, SemanticLimit,
};
use lodestore_storage::{Schema, Snapshot};
use tracing::{debug, trace};

use crate::config::IterationConfig;
use crate::cursor::{
    EmptyCursor, EntityCursor, IdsCursor, ScanFilter, SingleCursor, TypeScanCursor,
};
use crate::filter_links::FilterLinksCursor;
use crate::handle::{EntityIterableHandle, HandleBuilder, Matcher};
use crate::iterable::{IterableId, IterableKind, IterableNode};
use crate::iterator::EntityIterator;

/// A query session: the nodes built for one set of queries.
///
/// Closing the session expires every handle it built.
#[derive(Debug)]
pub struct QueryArena {
    schema: Arc<Schema>,
    config: IterationConfig,
    session: Liveness,
    nodes: Vec<IterableNode>,
    by_key: HashMap<Arc<str>, IterableId>,
}

impl QueryArena {
    /// Creates an empty arena validating against `schema`.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_config(schema, IterationConfig::default())
    }

    /// Creates an empty arena with the given configuration.
    #[must_use]
    pub fn with_config(schema: Arc<Schema>, config: IterationConfig) -> Self {
        Self {
            schema,
            config,
            session: Liveness::new(),
            nodes: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Creates an empty arena using the schema of `snapshot`.
    #[must_use]
    pub fn for_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(Arc::clone(snapshot.schema()))
    }

    /// Returns the schema nodes are validated against.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the arena configuration.
    #[must_use]
    pub fn config(&self) -> &IterationConfig {
        &self.config
    }

    /// Closes the session.
    ///
    /// All handles built by this arena report expired, open iterators fail
    /// on their next pull, and no further nodes can be built. Returns true
    /// if the session was open.
    pub fn close(&self) -> bool {
        let closed = self.session.expire();
        if closed {
            debug!(nodes = self.nodes.len(), "closed query session");
        }
        closed
    }

    /// Returns true once [`QueryArena::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.session.is_expired()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.session.is_expired() {
            Err(Error::new(ErrorKind::SessionClosed))
        } else {
            Ok(())
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node has been built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a node.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIterable` if the id was not issued by this arena.
    pub fn node(&self, id: IterableId) -> Result<&IterableNode> {
        self.nodes
            .get(id.index() as usize)
            .ok_or_else(|| Error::new(ErrorKind::UnknownIterable(id.index())))
    }

    /// Returns a node's handle.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIterable` if the id was not issued by this arena.
    pub fn handle(&self, id: IterableId) -> Result<&Arc<EntityIterableHandle>> {
        Ok(&self.node(id)?.handle)
    }

    /// Returns true if the node yields ids in strictly increasing order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIterable` if the id was not issued by this arena.
    pub fn is_sorted_by_id(&self, id: IterableId) -> Result<bool> {
        Ok(self.node(id)?.sorted_by_id)
    }

    /// Returns true if the node's result may be cached under its key.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIterable` if the id was not issued by this arena.
    pub fn can_be_cached(&self, id: IterableId) -> Result<bool> {
        Ok(self.node(id)?.cacheable)
    }

    /// Returns the canonical form of a node, with cached-instance wrappers
    /// stripped down to the innermost node that is not one.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIterable` if the id was not issued by this arena.
    pub fn source(&self, id: IterableId) -> Result<IterableId> {
        let mut current = id;
        while let IterableKind::CachedInstance { source, .. } = &self.node(current)?.kind {
            current = *source;
        }
        Ok(current)
    }

    /// Returns the first node built with the given key.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<IterableId> {
        self.by_key.get(key).copied()
    }

    /// Builds a node yielding nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session is closed.
    pub fn empty(&mut self) -> Result<IterableId> {
        self.push(IterableKind::Empty)
    }

    /// Builds a node yielding all entities of a type, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not registered or the session is
    /// closed.
    pub fn all_entities(&mut self, entity_type: u32) -> Result<IterableId> {
        self.schema.check_entity_type(entity_type)?;
        self.push(IterableKind::AllEntities { entity_type })
    }

    /// Builds a node yielding `id` if it exists.
    ///
    /// # Errors
    ///
    /// Returns `EmptyEntityId` for the sentinel, or an error if the type is
    /// not registered or the session is closed.
    pub fn single_entity(&mut self, id: EntityId) -> Result<IterableId> {
        if id.is_empty() {
            return Err(Error::empty_entity_id());
        }
        self.schema.check_entity_type(id.type_id)?;
        self.push(IterableKind::SingleEntity { id })
    }

    /// Builds a node yielding entities of a type that have `link` set.
    ///
    /// # Errors
    ///
    /// Returns an error if the type or link is not registered or the
    /// session is closed.
    pub fn entities_with_link(&mut self, entity_type: u32, link: LinkId) -> Result<IterableId> {
        self.schema.check_entity_type(entity_type)?;
        self.schema.check_link_type(link)?;
        self.push(IterableKind::EntitiesWithLink { entity_type, link })
    }

    /// Builds a node yielding entities of a type whose property equals
    /// `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type or property is not registered or the
    /// session is closed.
    pub fn property_equals(
        &mut self,
        entity_type: u32,
        property: PropertyId,
        value: impl Into<PropertyValue>,
    ) -> Result<IterableId> {
        self.schema.check_entity_type(entity_type)?;
        self.schema.check_property(property)?;
        self.push(IterableKind::PropertyEquals {
            entity_type,
            property,
            value: value.into(),
        })
    }

    /// Captures the result of `source` at `snapshot`.
    ///
    /// The new node shares its source's key, is not itself cacheable, and
    /// replays the captured ids only when iterated at the same live
    /// version; at any other version it re-pulls its source. Its handle
    /// expires when the version is retired.
    ///
    /// # Errors
    ///
    /// Returns `NotCacheable` if `source` is not cacheable, or any error
    /// from materializing it.
    pub fn cached(&mut self, source: IterableId, snapshot: &Snapshot) -> Result<IterableId> {
        let node = self.node(source)?;
        if !node.cacheable {
            return Err(Error::new(ErrorKind::NotCacheable(
                node.handle.string_handle().to_string(),
            )));
        }
        let ids: Arc<[EntityId]> = Arc::from(self.to_vec(source, snapshot)?);
        debug!(
            key = %node.handle,
            version = snapshot.version(),
            size = ids.len(),
            "captured cached instance"
        );
        self.push(IterableKind::CachedInstance {
            source,
            ids,
            version: snapshot.version(),
            liveness: snapshot.liveness().clone(),
        })
    }

    /// Opens an iterator over a node, reading through `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown, the session is closed, or the
    /// snapshot has expired.
    pub fn iterator(&self, id: IterableId, snapshot: &Snapshot) -> Result<EntityIterator<'_>> {
        self.ensure_open()?;
        snapshot.ensure_live()?;
        let cursor = self.cursor(id, snapshot)?;
        Ok(EntityIterator::new(
            cursor,
            snapshot.clone(),
            self.session.clone(),
        ))
    }

    /// Materializes a node's result as a set.
    ///
    /// # Errors
    ///
    /// Returns `LimitExceeded` if the set grows past
    /// [`IterationConfig::max_materialized_set`], or any error from
    /// iterating the node.
    pub fn to_set(&self, id: IterableId, snapshot: &Snapshot) -> Result<EntityIdSet> {
        let mut set = EntityIdSet::new();
        let mut iter = self.iterator(id, snapshot)?;
        while let Some(entity) = iter.next_id().map_err(|e| self.frame(id, e))? {
            set.insert(entity);
            self.check_limit(id, set.len())?;
        }
        debug!(
            key = %self.key_of(id),
            version = snapshot.version(),
            size = set.len(),
            "materialized entity set"
        );
        Ok(set)
    }

    /// Collects a node's result in iteration order.
    ///
    /// # Errors
    ///
    /// Same as [`QueryArena::to_set`].
    pub fn to_vec(&self, id: IterableId, snapshot: &Snapshot) -> Result<Vec<EntityId>> {
        let mut out = Vec::new();
        let mut iter = self.iterator(id, snapshot)?;
        while let Some(entity) = iter.next_id().map_err(|e| self.frame(id, e))? {
            out.push(entity);
            self.check_limit(id, out.len())?;
        }
        Ok(out)
    }

    fn check_limit(&self, id: IterableId, len: usize) -> Result<()> {
        match self.config.max_materialized_set {
            Some(limit) if len > limit => Err(Error::limit_exceeded(
                SemanticLimit::MaxMaterializedSet { limit },
            )
            .with_context(ErrorContext::new().with_source(self.key_of(id)))),
            _ => Ok(()),
        }
    }

    fn frame(&self, id: IterableId, error: Error) -> Error {
        error.with_frame(format!("materializing {}", self.key_of(id)))
    }

    fn key_of(&self, id: IterableId) -> String {
        self.nodes
            .get(id.0 as usize)
            .map_or_else(String::new, |node| node.handle.string_handle().to_string())
    }

    /// Builds the cursor tree for a node.
    pub(crate) fn cursor(
        &self,
        id: IterableId,
        snapshot: &Snapshot,
    ) -> Result<Box<dyn EntityCursor + '_>> {
        Ok(match &self.node(id)?.kind {
            IterableKind::Empty => Box::new(EmptyCursor),
            IterableKind::AllEntities { entity_type } => {
                Box::new(TypeScanCursor::new(*entity_type, ScanFilter::All))
            }
            IterableKind::SingleEntity { id } => Box::new(SingleCursor::new(*id)),
            IterableKind::EntitiesWithLink { entity_type, link } => Box::new(
                TypeScanCursor::new(*entity_type, ScanFilter::HasLink(*link)),
            ),
            IterableKind::PropertyEquals {
                entity_type,
                property,
                value,
            } => Box::new(TypeScanCursor::new(
                *entity_type,
                ScanFilter::PropertyEquals(*property, value.clone()),
            )),
            IterableKind::FilterLinks {
                link,
                source,
                entities,
            } => Box::new(FilterLinksCursor::new(
                self,
                self.cursor(*source, snapshot)?,
                *link,
                *entities,
            )),
            IterableKind::CachedInstance {
                source,
                ids,
                version,
                liveness,
            } => {
                if *version == snapshot.version()
                    && liveness.same_as(snapshot.liveness())
                    && !liveness.is_expired()
                {
                    Box::new(IdsCursor::new(Arc::clone(ids)))
                } else {
                    self.cursor(*source, snapshot)?
                }
            }
        })
    }

    /// Adds a node, or returns the existing node with the same key.
    pub(crate) fn push(&mut self, kind: IterableKind) -> Result<IterableId> {
        self.ensure_open()?;

        let children = self.children_of(&kind)?;
        let iterable_type = kind.iterable_type();
        let key = self.key_for(&kind, &children)?;

        let depth = 1 + children
            .iter()
            .map(|child| self.nodes[child.index() as usize].depth)
            .max()
            .unwrap_or(0);
        if depth > self.config.max_nesting_depth {
            return Err(Error::limit_exceeded(SemanticLimit::MaxNestingDepth {
                limit: self.config.max_nesting_depth,
            })
            .with_context(ErrorContext::new().with_source(key)));
        }

        let is_cached = matches!(kind, IterableKind::CachedInstance { .. });
        if self.config.deduplicate_nodes && !is_cached {
            if let Some(&existing) = self.by_key.get(key.as_str()) {
                trace!(key = %key, id = existing.index(), "reusing iterable node");
                return Ok(existing);
            }
        }

        let (own_sorted, own_cacheable) = match &kind {
            IterableKind::Empty => (true, false),
            IterableKind::AllEntities { .. }
            | IterableKind::SingleEntity { .. }
            | IterableKind::EntitiesWithLink { .. }
            | IterableKind::PropertyEquals { .. } => (true, true),
            IterableKind::FilterLinks { source, .. }
            | IterableKind::CachedInstance { source, .. } => {
                (self.nodes[source.0 as usize].sorted_by_id, false)
            }
        };
        let cacheable = own_cacheable
            && children
                .iter()
                .all(|child| self.nodes[child.0 as usize].cacheable);

        let snapshot = match &kind {
            IterableKind::CachedInstance { liveness, .. } => Some(liveness.clone()),
            _ => None,
        };
        let child_handles = children
            .iter()
            .map(|child| Arc::clone(&self.nodes[child.0 as usize].handle))
            .collect();
        let handle = Arc::new(EntityIterableHandle::new(
            iterable_type,
            key,
            matcher_for(&kind),
            child_handles,
            self.session.clone(),
            snapshot,
        ));

        let id = IterableId(
            u32::try_from(self.nodes.len())
                .map_err(|_| Error::internal("query arena is full"))?,
        );
        trace!(
            key = %handle,
            id = id.index(),
            depth,
            kind = iterable_type.description(),
            "built iterable node"
        );
        if !is_cached {
            self.by_key.entry(Arc::clone(handle.key())).or_insert(id);
        }
        self.nodes.push(IterableNode {
            kind,
            handle,
            sorted_by_id: own_sorted,
            cacheable,
            depth,
        });
        Ok(id)
    }

    fn children_of(&self, kind: &IterableKind) -> Result<Vec<IterableId>> {
        let mut children: Vec<IterableId> = kind.decorated().into_iter().collect();
        if let IterableKind::FilterLinks { entities, .. } = kind {
            children.push(*entities);
        }
        for child in &children {
            self.node(*child)?;
        }
        Ok(children)
    }

    fn key_for(&self, kind: &IterableKind, children: &[IterableId]) -> Result<String> {
        if let IterableKind::CachedInstance { source, .. } = kind {
            return Ok(self.handle(*source)?.string_handle().to_string());
        }

        let mut builder = HandleBuilder::new(kind.iterable_type());
        match kind {
            IterableKind::Empty | IterableKind::CachedInstance { .. } => {}
            IterableKind::AllEntities { entity_type } => {
                builder.param(entity_type);
            }
            IterableKind::SingleEntity { id } => {
                builder.param(id.type_id).param(id.local_id);
            }
            IterableKind::EntitiesWithLink { entity_type, link } => {
                builder.param(entity_type).param(link.index());
            }
            IterableKind::PropertyEquals {
                entity_type,
                property,
                value,
            } => {
                builder
                    .param(entity_type)
                    .param(property.index())
                    .value(value);
            }
            IterableKind::FilterLinks { link, .. } => {
                builder.param(link.index());
            }
        }
        for child in children {
            builder.child(self.handle(*child)?);
        }
        Ok(builder.finish())
    }
}

fn matcher_for(kind: &IterableKind) -> Matcher {
    match kind {
        IterableKind::Empty => Matcher::Empty,
        IterableKind::AllEntities { entity_type } => Matcher::AllEntities {
            entity_type: *entity_type,
        },
        IterableKind::SingleEntity { id } => Matcher::SingleEntity { id: *id },
        IterableKind::EntitiesWithLink { entity_type, link } => Matcher::EntitiesWithLink {
            entity_type: *entity_type,
            link: *link,
        },
        IterableKind::PropertyEquals {
            entity_type,
            property,
            value,
        } => Matcher::PropertyEquals {
            entity_type: *entity_type,
            property: *property,
            value: value.clone(),
        },
        IterableKind::FilterLinks { link, .. } => Matcher::FilterLinks { link: *link },
        IterableKind::CachedInstance { .. } => Matcher::CachedInstance,
    }
}
