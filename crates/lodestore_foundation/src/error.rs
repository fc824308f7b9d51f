//! Error types for the Lodestore system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Kinds fall into three groups: configuration errors raised when a query
//! or schema entry is built, consistency errors raised when a read goes
//! through a view that is no longer valid, and resource limits.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::ids::{LinkId, PropertyId};

/// Result alias used throughout Lodestore.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Lodestore operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Pushes a frame onto this error's context, creating it if needed.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_frame(frame));
        self
    }

    /// Creates an unknown link type error.
    #[must_use]
    pub fn unknown_link_type(link: LinkId) -> Self {
        Self::new(ErrorKind::UnknownLinkType(link))
    }

    /// Creates an unknown entity type error.
    #[must_use]
    pub fn unknown_entity_type(type_id: u32) -> Self {
        Self::new(ErrorKind::UnknownEntityType(type_id))
    }

    /// Creates an unknown property error.
    #[must_use]
    pub fn unknown_property(property: PropertyId) -> Self {
        Self::new(ErrorKind::UnknownProperty(property))
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates an error for a lookup keyed by the empty sentinel.
    #[must_use]
    pub fn empty_entity_id() -> Self {
        Self::new(ErrorKind::EmptyEntityId)
    }

    /// Creates a snapshot expired error.
    #[must_use]
    pub fn snapshot_expired(version: u64) -> Self {
        Self::new(ErrorKind::SnapshotExpired { version })
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates a malformed handle error.
    #[must_use]
    pub fn malformed_handle(
        key: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::MalformedHandle {
            key: key.into(),
            position,
            message: message.into(),
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if the error means the view it was read through is gone.
    ///
    /// Callers should rebuild their query from a fresh snapshot rather than
    /// retry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::SnapshotExpired { .. } | ErrorKind::SessionClosed
        )
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Link type was never registered.
    #[error("unknown link type: {0:?}")]
    UnknownLinkType(LinkId),

    /// Entity type was never registered.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(u32),

    /// Property was never registered.
    #[error("unknown property: {0:?}")]
    UnknownProperty(PropertyId),

    /// Iterable id does not belong to this query arena.
    #[error("unknown iterable: #{0}")]
    UnknownIterable(u32),

    /// A name was registered twice in the schema.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// Serialized handle could not be parsed.
    #[error("malformed handle {key:?} at {position}: {message}")]
    MalformedHandle {
        /// The key being parsed.
        key: String,
        /// Byte offset of the failure.
        position: usize,
        /// Description of what was expected.
        message: String,
    },

    /// The empty sentinel was used as an entity key.
    #[error("empty entity id used as a lookup key")]
    EmptyEntityId,

    /// Entity was not found in the snapshot.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// The snapshot a read went through has been retired.
    #[error("snapshot at version {version} has expired")]
    SnapshotExpired {
        /// Version of the retired snapshot.
        version: u64,
    },

    /// The query session that built the iterable has been closed.
    #[error("query session is closed")]
    SessionClosed,

    /// A write transaction was based on a version that is no longer current.
    #[error("write conflict: transaction based on version {base}, store is at {current}")]
    WriteConflict {
        /// Version the transaction started from.
        base: u64,
        /// Current store version.
        current: u64,
    },

    /// A result was captured for an iterable whose handle does not cover
    /// all of its inputs.
    #[error("iterable cannot be cached: {0}")]
    NotCacheable(String),

    /// An iterator was advanced after being disposed.
    #[error("iterator has been disposed")]
    IteratorDisposed,

    /// Semantic limit exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// A target entity set grew past the configured size while being
    /// materialized.
    MaxMaterializedSet {
        /// The configured limit.
        limit: usize,
    },
    /// A node would nest decorators deeper than the configured bound.
    MaxNestingDepth {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxMaterializedSet { limit } => {
                write!(f, "max materialized set size ({limit}) exceeded")
            }
            Self::MaxNestingDepth { limit } => {
                write!(f, "max nesting depth ({limit}) exceeded")
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Handle key or other label of the failing operation.
    pub source: Option<String>,
    /// Chain of operations that led to the error, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
