//! The versioned store and its write transactions.
//!
//! Writers stage changes in a [`WriteTransaction`] built on the current
//! snapshot; [`Store::commit`] publishes them as a new version and returns
//! the [`Mutation`]s that were applied, which is what cache invalidation
//! consumes. Readers hold on to [`Snapshot`]s and are never affected by
//! later commits until their version is retired.

use std::collections::VecDeque;
use std::sync::Arc;

use lodestore_foundation::{
    EntityId, Error, ErrorKind, LinkId, Liveness, Mutation, PropertyId, PropertyValue, Result,
};
use tracing::debug;

use crate::config::StoreConfig;
use crate::schema::Schema;
use crate::snapshot::{Snapshot, Tables};

/// An in-memory entity store with versioned snapshots.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    current: Snapshot,
    /// Superseded versions that are still readable, oldest first.
    history: VecDeque<(u64, Liveness)>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            current: Snapshot::new(0, Arc::new(Schema::new()), Tables::default()),
            history: VecDeque::new(),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the current version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.version()
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        self.current.schema()
    }

    /// Returns a snapshot of the current version.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    fn update_schema<T>(&mut self, f: impl FnOnce(&mut Schema) -> Result<T>) -> Result<T> {
        let mut schema = Schema::clone(self.current.schema());
        let result = f(&mut schema)?;
        self.current.set_schema(Arc::new(schema));
        Ok(result)
    }

    /// Registers an entity type.
    ///
    /// Registration does not create a new version; snapshots taken before
    /// keep the schema they were taken with.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already registered.
    pub fn register_entity_type(&mut self, name: &str) -> Result<u32> {
        let id = self.update_schema(|schema| schema.register_entity_type(name))?;
        debug!(name, id, "registered entity type");
        Ok(id)
    }

    /// Registers a link type.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already registered.
    pub fn register_link_type(&mut self, name: &str) -> Result<LinkId> {
        let id = self.update_schema(|schema| schema.register_link_type(name))?;
        debug!(name, id = id.0, "registered link type");
        Ok(id)
    }

    /// Registers a property.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already registered.
    pub fn register_property(&mut self, name: &str) -> Result<PropertyId> {
        let id = self.update_schema(|schema| schema.register_property(name))?;
        debug!(name, id = id.0, "registered property");
        Ok(id)
    }

    /// Starts a write transaction on the current version.
    #[must_use]
    pub fn begin_write(&self) -> WriteTransaction {
        WriteTransaction {
            base_version: self.current.version(),
            schema: Arc::clone(self.current.schema()),
            tables: self.current.tables().clone(),
            mutations: Vec::new(),
        }
    }

    /// Publishes a transaction as a new version.
    ///
    /// Returns the mutations applied, in the order they happened. A
    /// transaction with no changes publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns `WriteConflict` if another commit landed after the
    /// transaction began.
    pub fn commit(&mut self, txn: WriteTransaction) -> Result<Vec<Mutation>> {
        let current = self.current.version();
        if txn.base_version != current {
            return Err(Error::new(ErrorKind::WriteConflict {
                base: txn.base_version,
                current,
            }));
        }
        if txn.mutations.is_empty() {
            return Ok(Vec::new());
        }

        let next = Snapshot::new(current + 1, Arc::clone(self.current.schema()), txn.tables);
        let previous = std::mem::replace(&mut self.current, next);
        self.history
            .push_back((previous.version(), previous.liveness().clone()));
        self.retire_excess();

        debug!(
            version = self.current.version(),
            mutations = txn.mutations.len(),
            "committed write transaction"
        );
        Ok(txn.mutations)
    }

    fn retire_excess(&mut self) {
        while self.history.len() > self.config.retained_versions {
            if let Some((version, liveness)) = self.history.pop_front() {
                liveness.expire();
                debug!(version, "retired snapshot version");
            }
        }
    }

    /// Expires every superseded version immediately.
    ///
    /// Only snapshots of the current version stay readable.
    pub fn release_history(&mut self) {
        for (version, liveness) in self.history.drain(..) {
            liveness.expire();
            debug!(version, "retired snapshot version");
        }
    }

    /// Returns the number of superseded versions still readable.
    #[must_use]
    pub fn retained_versions(&self) -> usize {
        self.history.len()
    }
}

/// Staged changes against one store version.
///
/// Reads inside the transaction see its own writes.
#[derive(Debug)]
pub struct WriteTransaction {
    base_version: u64,
    schema: Arc<Schema>,
    tables: Tables,
    mutations: Vec<Mutation>,
}

impl WriteTransaction {
    /// Returns the version this transaction started from.
    #[must_use]
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Returns the mutations staged so far.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    fn check_exists(&self, id: EntityId) -> Result<()> {
        if id.is_empty() {
            return Err(Error::empty_entity_id());
        }
        if self.tables.contains(id) {
            Ok(())
        } else {
            Err(Error::entity_not_found(id))
        }
    }

    /// Returns true if the entity exists in this transaction's view.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        !id.is_empty() && self.tables.contains(id)
    }

    /// Returns the target of `owner`'s link in this transaction's view.
    #[must_use]
    pub fn link_target(&self, owner: EntityId, link: LinkId) -> Option<EntityId> {
        self.tables.link_target(owner, link)
    }

    /// Creates a new entity of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type is not registered.
    pub fn create_entity(&mut self, type_id: u32) -> Result<EntityId> {
        self.schema.check_entity_type(type_id)?;
        let id = self.tables.allocate(type_id);
        self.mutations.push(Mutation::EntityAdded(id));
        Ok(id)
    }

    /// Deletes an entity together with its properties, its links, and the
    /// links of other entities pointing at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<()> {
        self.check_exists(id)?;
        self.tables.remove_entity(id, &mut self.mutations);
        Ok(())
    }

    /// Points `source`'s link of type `link` at `target`.
    ///
    /// An owner has at most one target per link type; an existing target is
    /// replaced. Setting the same target again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the link type is not registered or either entity
    /// does not exist.
    pub fn set_link(&mut self, source: EntityId, link: LinkId, target: EntityId) -> Result<()> {
        self.schema.check_link_type(link)?;
        self.check_exists(source)?;
        self.check_exists(target)?;

        if self.tables.link_target(source, link) == Some(target) {
            return Ok(());
        }
        if let Some(old) = self.tables.insert_link(source, link, target) {
            self.mutations.push(Mutation::LinkDeleted {
                source,
                target: old,
                link,
            });
        }
        self.mutations.push(Mutation::LinkAdded {
            source,
            target,
            link,
        });
        Ok(())
    }

    /// Removes `source`'s link of type `link`, returning its old target.
    ///
    /// # Errors
    ///
    /// Returns an error if the link type is not registered or the source
    /// does not exist.
    pub fn delete_link(&mut self, source: EntityId, link: LinkId) -> Result<Option<EntityId>> {
        self.schema.check_link_type(link)?;
        self.check_exists(source)?;

        let removed = self.tables.remove_link(source, link);
        if let Some(target) = removed {
            self.mutations.push(Mutation::LinkDeleted {
                source,
                target,
                link,
            });
        }
        Ok(removed)
    }

    /// Sets a property value. Setting an equal value is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is not registered or the entity
    /// does not exist.
    pub fn set_property(
        &mut self,
        entity: EntityId,
        property: PropertyId,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.schema.check_property(property)?;
        self.check_exists(entity)?;

        let value = value.into();
        if self.tables.property(entity, property) == Some(&value) {
            return Ok(());
        }
        let old = self.tables.insert_property(entity, property, value.clone());
        self.mutations.push(Mutation::PropertyChanged {
            entity_type: entity.type_id,
            property,
            old,
            new: Some(value),
        });
        Ok(())
    }

    /// Removes a property value, returning the old one.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is not registered or the entity
    /// does not exist.
    pub fn delete_property(
        &mut self,
        entity: EntityId,
        property: PropertyId,
    ) -> Result<Option<PropertyValue>> {
        self.schema.check_property(property)?;
        self.check_exists(entity)?;

        let old = self.tables.remove_property(entity, property);
        if let Some(value) = &old {
            self.mutations.push(Mutation::PropertyChanged {
                entity_type: entity.type_id,
                property,
                old: Some(value.clone()),
                new: None,
            });
        }
        Ok(old)
    }
}
