//! Type tags of iterable nodes.

use std::fmt;

/// The closed set of iterable node kinds.
///
/// The numeric id is the first token of every serialized handle key, so
/// the values must never change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IterableType {
    /// Yields nothing.
    Empty,
    /// All entities of one type.
    AllEntities,
    /// One entity, if it exists.
    SingleEntity,
    /// Entities of one type that have a given link set.
    EntitiesWithLink,
    /// Entities of one type whose property equals a value.
    PropertyEquals,
    /// Source entities whose link points into a target set.
    FilterLinks,
    /// A source result captured at one snapshot version.
    ///
    /// Cached instances reuse their source's key and never write a tag of
    /// their own.
    CachedInstance,
}

impl IterableType {
    /// Returns the numeric tag written into handle keys.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::AllEntities => 1,
            Self::SingleEntity => 2,
            Self::EntitiesWithLink => 3,
            Self::PropertyEquals => 4,
            Self::FilterLinks => 5,
            Self::CachedInstance => 6,
        }
    }

    /// Returns the type for a tag read from a handle key.
    ///
    /// [`IterableType::CachedInstance`] never appears in keys and is not
    /// returned.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Empty),
            1 => Some(Self::AllEntities),
            2 => Some(Self::SingleEntity),
            3 => Some(Self::EntitiesWithLink),
            4 => Some(Self::PropertyEquals),
            5 => Some(Self::FilterLinks),
            _ => None,
        }
    }

    /// Returns true for kinds that wrap a source iterable.
    #[must_use]
    pub const fn is_decorator(self) -> bool {
        matches!(self, Self::FilterLinks | Self::CachedInstance)
    }

    /// Returns a human-readable name.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::AllEntities => "all entities",
            Self::SingleEntity => "single entity",
            Self::EntitiesWithLink => "entities with link",
            Self::PropertyEquals => "property equals",
            Self::FilterLinks => "filter links",
            Self::CachedInstance => "cached instance",
        }
    }
}

impl fmt::Display for IterableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
