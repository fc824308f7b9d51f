//! Core identifiers, id sets, mutations, and errors for Lodestore.
//!
//! This crate provides:
//! - [`EntityId`] - Entity identifiers keyed by type and local id
//! - [`EntityIdSet`] - Fast membership-testable sets of ids
//! - [`LinkId`] / [`PropertyId`] - Registered link and property ids
//! - [`PropertyValue`] - Comparable property values
//! - [`Mutation`] - Committed changes used for cache invalidation
//! - [`Liveness`] - Shared expiry tokens
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod id_set;
pub mod ids;
pub mod liveness;
pub mod mutation;
pub mod value;

pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, Result, SemanticLimit};
pub use id_set::EntityIdSet;
pub use ids::{LinkId, PropertyId};
pub use liveness::Liveness;
pub use mutation::Mutation;
pub use value::PropertyValue;
