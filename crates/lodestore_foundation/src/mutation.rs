//! Mutation events published by the store on commit.
//!
//! Handles decide from these alone whether a cached result is still valid.

use crate::entity::EntityId;
use crate::ids::{LinkId, PropertyId};
use crate::value::PropertyValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single committed change to the entity graph.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mutation {
    /// An entity was created.
    EntityAdded(EntityId),
    /// An entity was deleted.
    EntityDeleted(EntityId),
    /// A link edge was created.
    LinkAdded {
        /// Entity owning the link.
        source: EntityId,
        /// Entity the link points at.
        target: EntityId,
        /// Link type.
        link: LinkId,
    },
    /// A link edge was removed.
    LinkDeleted {
        /// Entity owning the link.
        source: EntityId,
        /// Entity the link pointed at.
        target: EntityId,
        /// Link type.
        link: LinkId,
    },
    /// A property was set, changed, or removed.
    PropertyChanged {
        /// Type of the entity owning the property.
        entity_type: u32,
        /// Property that changed.
        property: PropertyId,
        /// Previous value (`None` if the property was unset).
        old: Option<PropertyValue>,
        /// New value (`None` if the property was removed).
        new: Option<PropertyValue>,
    },
}

impl Mutation {
    /// Returns the link type this mutation touches, if it is a link change.
    #[must_use]
    pub fn link(&self) -> Option<LinkId> {
        match self {
            Self::LinkAdded { link, .. } | Self::LinkDeleted { link, .. } => Some(*link),
            _ => None,
        }
    }
}
