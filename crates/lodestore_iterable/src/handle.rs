//! Structural identities of iterable nodes.
//!
//! Every node in a [`QueryArena`](crate::QueryArena) owns an
//! [`EntityIterableHandle`]. The handle's string key is reproducible (equal
//! queries give byte-identical keys) and composite (a node writes its type
//! tag and parameters, then each child's key, separated by `-`). Keys are
//! prefix-coded: the type tag determines how many parameters and children
//! follow, so structurally different trees never produce the same key and
//! a key can be parsed back into the tree it came from.
//!
//! ```text
//! 0                                  empty
//! 1-<type>                           all entities of a type
//! 2-<type>-<local>                   single entity
//! 3-<type>-<link>                    entities with a link set
//! 4-<type>-<property>-<value>        property equals; value is b0|b1|i<n>|s<len>:<text>
//! 5-<link>-<source>-<entities>       filter links
//! ```
//!
//! Cached instances reuse their source's key.
//!
//! The `matches_*` predicates answer, from the handle alone, whether a
//! committed mutation could change the node's result. They are
//! conservative: a false positive costs a recomputation, a false negative
//! would serve a stale result.

use std::fmt;
use std::sync::Arc;

use lodestore_foundation::{EntityId, LinkId, Liveness, Mutation, PropertyId, PropertyValue};

use crate::iterable_type::IterableType;

/// Accumulates a handle key.
///
/// Children are written by threading the same builder through their
/// handles, producing one continuous key.
#[derive(Clone, Debug, Default)]
pub struct HandleBuilder {
    buf: String,
}

impl HandleBuilder {
    /// Starts a key with the given node type tag.
    #[must_use]
    pub fn new(iterable_type: IterableType) -> Self {
        Self {
            buf: iterable_type.id().to_string(),
        }
    }

    /// Appends a scalar parameter.
    pub fn param(&mut self, value: impl fmt::Display) -> &mut Self {
        self.buf.push('-');
        self.buf.push_str(&value.to_string());
        self
    }

    /// Appends a property value parameter.
    ///
    /// Strings are length-prefixed so they may contain the delimiter.
    pub fn value(&mut self, value: &PropertyValue) -> &mut Self {
        self.buf.push('-');
        match value {
            PropertyValue::Bool(b) => self.buf.push_str(if *b { "b1" } else { "b0" }),
            PropertyValue::Int(i) => {
                self.buf.push('i');
                self.buf.push_str(&i.to_string());
            }
            PropertyValue::String(s) => {
                self.buf.push('s');
                self.buf.push_str(&s.len().to_string());
                self.buf.push(':');
                self.buf.push_str(s);
            }
        }
        self
    }

    /// Appends a child's full key.
    pub fn child(&mut self, child: &EntityIterableHandle) -> &mut Self {
        self.buf.push('-');
        child.write_string_handle(self);
        self
    }

    /// Returns the key written so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Consumes the builder and returns the key.
    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }
}

/// Node-specific data the invalidation predicates need.
#[derive(Clone, Debug)]
pub(crate) enum Matcher {
    Empty,
    AllEntities {
        entity_type: u32,
    },
    SingleEntity {
        id: EntityId,
    },
    EntitiesWithLink {
        entity_type: u32,
        link: LinkId,
    },
    PropertyEquals {
        entity_type: u32,
        property: PropertyId,
        value: PropertyValue,
    },
    FilterLinks {
        link: LinkId,
    },
    CachedInstance,
}

impl Matcher {
    fn own_link(&self) -> Option<LinkId> {
        match self {
            Self::EntitiesWithLink { link, .. } | Self::FilterLinks { link } => Some(*link),
            _ => None,
        }
    }
}

/// Identity and cache key of one iterable node.
///
/// Immutable after construction. Holds its children's handles, so the
/// predicates of a composite node are answered without touching the arena
/// or the store.
pub struct EntityIterableHandle {
    iterable_type: IterableType,
    key: Arc<str>,
    matcher: Matcher,
    children: Vec<Arc<EntityIterableHandle>>,
    /// Sorted, deduplicated link types this node depends on, transitively.
    link_ids: Vec<LinkId>,
    session: Liveness,
    snapshot: Option<Liveness>,
}

impl EntityIterableHandle {
    pub(crate) fn new(
        iterable_type: IterableType,
        key: String,
        matcher: Matcher,
        children: Vec<Arc<EntityIterableHandle>>,
        session: Liveness,
        snapshot: Option<Liveness>,
    ) -> Self {
        let mut link_ids: Vec<LinkId> = matcher.own_link().into_iter().collect();
        for child in &children {
            link_ids.extend_from_slice(&child.link_ids);
        }
        link_ids.sort_unstable();
        link_ids.dedup();

        Self {
            iterable_type,
            key: Arc::from(key),
            matcher,
            children,
            link_ids,
            session,
            snapshot,
        }
    }

    /// Returns the type of the node this handle identifies.
    #[must_use]
    pub fn iterable_type(&self) -> IterableType {
        self.iterable_type
    }

    /// Returns the serialized key.
    #[must_use]
    pub fn string_handle(&self) -> &str {
        &self.key
    }

    pub(crate) fn key(&self) -> &Arc<str> {
        &self.key
    }

    /// Writes the serialized key into a builder.
    pub fn write_string_handle(&self, builder: &mut HandleBuilder) {
        builder.buf.push_str(&self.key);
    }

    /// Returns the handles of this node's children, in key order.
    #[must_use]
    pub fn children(&self) -> &[Arc<EntityIterableHandle>] {
        &self.children
    }

    fn any_child(&self, f: impl Fn(&EntityIterableHandle) -> bool) -> bool {
        self.children.iter().any(|child| f(child))
    }

    /// Could the result change because `added` was created?
    #[must_use]
    pub fn matches_entity_added(&self, added: EntityId) -> bool {
        match &self.matcher {
            Matcher::AllEntities { entity_type } => added.type_id == *entity_type,
            Matcher::SingleEntity { id } => *id == added,
            // A new entity has no links or properties yet
            Matcher::Empty | Matcher::EntitiesWithLink { .. } | Matcher::PropertyEquals { .. } => {
                false
            }
            Matcher::FilterLinks { .. } | Matcher::CachedInstance => {
                self.any_child(|child| child.matches_entity_added(added))
            }
        }
    }

    /// Could the result change because `deleted` was removed?
    #[must_use]
    pub fn matches_entity_deleted(&self, deleted: EntityId) -> bool {
        match &self.matcher {
            Matcher::Empty => false,
            Matcher::AllEntities { entity_type }
            | Matcher::EntitiesWithLink { entity_type, .. }
            | Matcher::PropertyEquals { entity_type, .. } => deleted.type_id == *entity_type,
            Matcher::SingleEntity { id } => *id == deleted,
            Matcher::FilterLinks { .. } | Matcher::CachedInstance => {
                self.any_child(|child| child.matches_entity_deleted(deleted))
            }
        }
    }

    fn matches_link_change(&self, source: EntityId, link: LinkId) -> bool {
        match &self.matcher {
            Matcher::EntitiesWithLink {
                entity_type,
                link: own,
            } => *own == link && source.type_id == *entity_type,
            Matcher::FilterLinks { link: own } => {
                *own == link || self.any_child(|child| child.matches_link_change(source, link))
            }
            Matcher::CachedInstance => {
                self.any_child(|child| child.matches_link_change(source, link))
            }
            Matcher::Empty
            | Matcher::AllEntities { .. }
            | Matcher::SingleEntity { .. }
            | Matcher::PropertyEquals { .. } => false,
        }
    }

    /// Could the result change because `source` gained a link?
    ///
    /// The target is not consulted: which targets matter depends on sets
    /// this handle does not capture.
    #[must_use]
    pub fn matches_link_added(&self, source: EntityId, _target: EntityId, link: LinkId) -> bool {
        self.matches_link_change(source, link)
    }

    /// Could the result change because `source` lost a link?
    #[must_use]
    pub fn matches_link_deleted(&self, source: EntityId, _target: EntityId, link: LinkId) -> bool {
        self.matches_link_change(source, link)
    }

    /// Could the result change because a property of an entity of
    /// `entity_type` went from `old` to `new`?
    #[must_use]
    pub fn matches_property_changed(
        &self,
        entity_type: u32,
        property: PropertyId,
        old: Option<&PropertyValue>,
        new: Option<&PropertyValue>,
    ) -> bool {
        match &self.matcher {
            Matcher::PropertyEquals {
                entity_type: own_type,
                property: own_property,
                value,
            } => {
                *own_type == entity_type
                    && *own_property == property
                    && (old == Some(value) || new == Some(value))
            }
            Matcher::FilterLinks { .. } | Matcher::CachedInstance => self.any_child(|child| {
                child.matches_property_changed(entity_type, property, old, new)
            }),
            Matcher::Empty
            | Matcher::AllEntities { .. }
            | Matcher::SingleEntity { .. }
            | Matcher::EntitiesWithLink { .. } => false,
        }
    }

    /// Dispatches a committed mutation to the matching predicate.
    #[must_use]
    pub fn matches(&self, mutation: &Mutation) -> bool {
        match mutation {
            Mutation::EntityAdded(id) => self.matches_entity_added(*id),
            Mutation::EntityDeleted(id) => self.matches_entity_deleted(*id),
            Mutation::LinkAdded {
                source,
                target,
                link,
            } => self.matches_link_added(*source, *target, *link),
            Mutation::LinkDeleted {
                source,
                target,
                link,
            } => self.matches_link_deleted(*source, *target, *link),
            Mutation::PropertyChanged {
                entity_type,
                property,
                old,
                new,
            } => self.matches_property_changed(*entity_type, *property, old.as_ref(), new.as_ref()),
        }
    }

    /// Returns the link types this node depends on, sorted.
    ///
    /// A link mutation whose type is not listed can never match.
    #[must_use]
    pub fn link_ids(&self) -> &[LinkId] {
        &self.link_ids
    }

    /// Returns true if the node depends on the given link type.
    #[must_use]
    pub fn has_link_id(&self, link: LinkId) -> bool {
        self.link_ids.binary_search(&link).is_ok()
    }

    /// Returns true once the session that built this handle is closed, or a
    /// snapshot captured by this node or a descendant has been retired.
    ///
    /// A cached result under an expired handle must not be served and its
    /// key must not be used for new lookups.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.session.is_expired()
            || self.snapshot.as_ref().is_some_and(Liveness::is_expired)
            || self.children.iter().any(|child| child.is_expired())
    }
}

impl fmt::Debug for EntityIterableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityIterableHandle")
            .field("type", &self.iterable_type)
            .field("key", &self.key)
            .field("link_ids", &self.link_ids)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for EntityIterableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
