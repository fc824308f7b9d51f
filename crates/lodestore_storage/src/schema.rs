//! Schema registry for entity types, link types, and properties.
//!
//! Every id used by a query or a write must be registered here first. Ids
//! are dense and assigned in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use lodestore_foundation::{Error, ErrorKind, LinkId, PropertyId, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bidirectional name <-> id table for one kind of schema entry.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct NameTable {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, u32>,
}

impl NameTable {
    fn register(&mut self, name: &str, kind: &str) -> Result<u32> {
        if self.ids.contains_key(name) {
            return Err(Error::new(ErrorKind::DuplicateName(format!(
                "{kind} already registered: {name}"
            ))));
        }
        let id = u32::try_from(self.names.len())
            .map_err(|_| Error::internal(format!("too many {kind}s registered")))?;
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.ids.insert(name, id);
        Ok(id)
    }

    fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(AsRef::as_ref)
    }

    fn contains(&self, id: u32) -> bool {
        (id as usize) < self.names.len()
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

/// Registered entity types, link types, and properties.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schema {
    entity_types: NameTable,
    link_types: NameTable,
    properties: NameTable,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity type with the same name is already registered.
    pub fn register_entity_type(&mut self, name: &str) -> Result<u32> {
        self.entity_types.register(name, "entity type")
    }

    /// Registers a link type.
    ///
    /// # Errors
    ///
    /// Returns an error if a link type with the same name is already registered.
    pub fn register_link_type(&mut self, name: &str) -> Result<LinkId> {
        self.link_types.register(name, "link type").map(LinkId)
    }

    /// Registers a property.
    ///
    /// # Errors
    ///
    /// Returns an error if a property with the same name is already registered.
    pub fn register_property(&mut self, name: &str) -> Result<PropertyId> {
        self.properties.register(name, "property").map(PropertyId)
    }

    /// Looks up an entity type by name.
    #[must_use]
    pub fn entity_type(&self, name: &str) -> Option<u32> {
        self.entity_types.id(name)
    }

    /// Looks up a link type by name.
    #[must_use]
    pub fn link_type(&self, name: &str) -> Option<LinkId> {
        self.link_types.id(name).map(LinkId)
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<PropertyId> {
        self.properties.id(name).map(PropertyId)
    }

    /// Returns the name of an entity type.
    #[must_use]
    pub fn entity_type_name(&self, type_id: u32) -> Option<&str> {
        self.entity_types.name(type_id)
    }

    /// Returns the name of a link type.
    #[must_use]
    pub fn link_type_name(&self, link: LinkId) -> Option<&str> {
        self.link_types.name(link.0)
    }

    /// Returns the name of a property.
    #[must_use]
    pub fn property_name(&self, property: PropertyId) -> Option<&str> {
        self.properties.name(property.0)
    }

    /// Returns the number of registered entity types.
    #[must_use]
    pub fn entity_type_count(&self) -> usize {
        self.entity_types.len()
    }

    /// Returns the number of registered link types.
    #[must_use]
    pub fn link_type_count(&self) -> usize {
        self.link_types.len()
    }

    /// Checks that an entity type is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnknownEntityType`] if it is not.
    pub fn check_entity_type(&self, type_id: u32) -> Result<()> {
        if self.entity_types.contains(type_id) {
            Ok(())
        } else {
            Err(Error::unknown_entity_type(type_id))
        }
    }

    /// Checks that a link type is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnknownLinkType`] if it is not.
    pub fn check_link_type(&self, link: LinkId) -> Result<()> {
        if self.link_types.contains(link.0) {
            Ok(())
        } else {
            Err(Error::unknown_link_type(link))
        }
    }

    /// Checks that a property is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnknownProperty`] if it is not.
    pub fn check_property(&self, property: PropertyId) -> Result<()> {
        if self.properties.contains(property.0) {
            Ok(())
        } else {
            Err(Error::unknown_property(property))
        }
    }
}
