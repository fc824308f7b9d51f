//! Immutable point-in-time views of the store.
//!
//! A `Snapshot` is what iterators read through. It is cheap to clone (all
//! tables are persistent `im` structures) and never changes after it is
//! published. Once the store retires its version, every read fails with
//! [`ErrorKind::SnapshotExpired`](lodestore_foundation::ErrorKind::SnapshotExpired).

use std::ops::Bound;
use std::sync::Arc;

use im::{OrdMap, OrdSet};
use lodestore_foundation::{
    EntityId, Error, LinkId, Liveness, Mutation, PropertyId, PropertyValue, Result,
};

use crate::schema::Schema;

/// The persistent tables shared between snapshots and write transactions.
#[derive(Clone, Debug, Default)]
pub(crate) struct Tables {
    /// Live local ids per entity type.
    entities: OrdMap<u32, OrdSet<u64>>,
    /// Next local id to hand out per entity type. Ids are never reused.
    next_local: OrdMap<u32, u64>,
    /// Forward index: (owner, link) -> target.
    links: OrdMap<(EntityId, LinkId), EntityId>,
    /// Reverse index: target -> set of (owner, link) pointing at it.
    incoming: OrdMap<EntityId, OrdSet<(EntityId, LinkId)>>,
    /// Property values by (entity, property).
    properties: OrdMap<(EntityId, PropertyId), PropertyValue>,
}

impl Tables {
    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.entities
            .get(&id.type_id)
            .is_some_and(|locals| locals.contains(&id.local_id))
    }

    pub(crate) fn link_target(&self, owner: EntityId, link: LinkId) -> Option<EntityId> {
        self.links.get(&(owner, link)).copied()
    }

    pub(crate) fn property(&self, entity: EntityId, property: PropertyId) -> Option<&PropertyValue> {
        self.properties.get(&(entity, property))
    }

    pub(crate) fn allocate(&mut self, type_id: u32) -> EntityId {
        let local_id = self.next_local.get(&type_id).copied().unwrap_or(0);
        self.next_local.insert(type_id, local_id + 1);

        let mut locals = self.entities.get(&type_id).cloned().unwrap_or_default();
        locals.insert(local_id);
        self.entities.insert(type_id, locals);

        EntityId::new(type_id, local_id)
    }

    /// Removes an entity with all its links and properties, recording the
    /// resulting mutations in order.
    pub(crate) fn remove_entity(&mut self, id: EntityId, out: &mut Vec<Mutation>) {
        let outgoing: Vec<(LinkId, EntityId)> = self
            .links
            .range((id, LinkId(0))..=(id, LinkId(u32::MAX)))
            .map(|((_, link), target)| (*link, *target))
            .collect();
        for (link, target) in outgoing {
            self.remove_link(id, link);
            out.push(Mutation::LinkDeleted {
                source: id,
                target,
                link,
            });
        }

        let referrers: Vec<(EntityId, LinkId)> = self
            .incoming
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for (source, link) in referrers {
            self.remove_link(source, link);
            out.push(Mutation::LinkDeleted {
                source,
                target: id,
                link,
            });
        }

        let props: Vec<(PropertyId, PropertyValue)> = self
            .properties
            .range((id, PropertyId(0))..=(id, PropertyId(u32::MAX)))
            .map(|((_, property), value)| (*property, value.clone()))
            .collect();
        for (property, old) in props {
            self.properties.remove(&(id, property));
            out.push(Mutation::PropertyChanged {
                entity_type: id.type_id,
                property,
                old: Some(old),
                new: None,
            });
        }

        if let Some(mut locals) = self.entities.get(&id.type_id).cloned() {
            locals.remove(&id.local_id);
            self.entities.insert(id.type_id, locals);
        }
        out.push(Mutation::EntityDeleted(id));
    }

    /// Points `owner`'s link at `target`, returning the previous target.
    pub(crate) fn insert_link(
        &mut self,
        owner: EntityId,
        link: LinkId,
        target: EntityId,
    ) -> Option<EntityId> {
        let previous = self.remove_link(owner, link);
        self.links.insert((owner, link), target);
        let mut referrers = self.incoming.get(&target).cloned().unwrap_or_default();
        referrers.insert((owner, link));
        self.incoming.insert(target, referrers);
        previous
    }

    /// Removes `owner`'s link, returning the target it pointed at.
    pub(crate) fn remove_link(&mut self, owner: EntityId, link: LinkId) -> Option<EntityId> {
        let target = self.links.remove(&(owner, link))?;
        if let Some(mut referrers) = self.incoming.get(&target).cloned() {
            referrers.remove(&(owner, link));
            if referrers.is_empty() {
                self.incoming.remove(&target);
            } else {
                self.incoming.insert(target, referrers);
            }
        }
        Some(target)
    }

    pub(crate) fn insert_property(
        &mut self,
        entity: EntityId,
        property: PropertyId,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.properties.insert((entity, property), value)
    }

    pub(crate) fn remove_property(
        &mut self,
        entity: EntityId,
        property: PropertyId,
    ) -> Option<PropertyValue> {
        self.properties.remove(&(entity, property))
    }
}

/// Immutable view of the store at one version.
///
/// Clone is O(1) due to structural sharing.
#[derive(Clone, Debug)]
pub struct Snapshot {
    version: u64,
    liveness: Liveness,
    schema: Arc<Schema>,
    tables: Tables,
}

impl Snapshot {
    pub(crate) fn new(version: u64, schema: Arc<Schema>, tables: Tables) -> Self {
        Self {
            version,
            liveness: Liveness::new(),
            schema,
            tables,
        }
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.tables
    }

    pub(crate) fn set_schema(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
    }

    /// Returns the store version this snapshot was published at.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the schema this snapshot was published with.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the expiry token of this snapshot's version.
    #[must_use]
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Returns true once the store has retired this version.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.liveness.is_expired()
    }

    /// Fails if this snapshot has been retired.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotExpired` if the version has been retired.
    pub fn ensure_live(&self) -> Result<()> {
        if self.liveness.is_expired() {
            Err(Error::snapshot_expired(self.version))
        } else {
            Ok(())
        }
    }

    fn check_key(&self, id: EntityId) -> Result<()> {
        self.ensure_live()?;
        if id.is_empty() {
            return Err(Error::empty_entity_id());
        }
        Ok(())
    }

    /// Returns true if the entity exists in this snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot expired or `id` is the empty sentinel.
    pub fn contains(&self, id: EntityId) -> Result<bool> {
        self.check_key(id)?;
        Ok(self.tables.contains(id))
    }

    /// Returns the target of `owner`'s link of type `link`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot expired or `owner` is the empty sentinel.
    pub fn link_target(&self, owner: EntityId, link: LinkId) -> Result<Option<EntityId>> {
        self.check_key(owner)?;
        Ok(self.tables.link_target(owner, link))
    }

    /// Returns the value of `entity`'s property, if set.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot expired or `entity` is the empty sentinel.
    pub fn property(&self, entity: EntityId, property: PropertyId) -> Result<Option<PropertyValue>> {
        self.check_key(entity)?;
        Ok(self.tables.property(entity, property).cloned())
    }

    /// Returns the smallest entity of `type_id` with a local id greater than
    /// `after` (or the smallest overall when `after` is `None`).
    ///
    /// Repeated calls give a lazy, ordered scan over one type without
    /// borrowing the snapshot between steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot expired.
    pub fn next_of_type(&self, type_id: u32, after: Option<u64>) -> Result<Option<EntityId>> {
        self.ensure_live()?;
        let Some(locals) = self.tables.entities.get(&type_id) else {
            return Ok(None);
        };
        let lower = match after {
            Some(local_id) => Bound::Excluded(local_id),
            None => Bound::Unbounded,
        };
        Ok(locals
            .range((lower, Bound::Unbounded))
            .next()
            .map(|local_id| EntityId::new(type_id, *local_id)))
    }

    /// Returns the number of live entities of `type_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot expired.
    pub fn entity_count(&self, type_id: u32) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.tables.entities.get(&type_id).map_or(0, OrdSet::len))
    }

    /// Returns the entities linking to `target`, as `(owner, link)` pairs
    /// in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot expired or `target` is the empty sentinel.
    pub fn referrers(&self, target: EntityId) -> Result<Vec<(EntityId, LinkId)>> {
        self.check_key(target)?;
        Ok(self
            .tables
            .incoming
            .get(&target)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}
