//! Schema registry, versioned snapshots, and write transactions for Lodestore.
//!
//! This crate provides:
//! - [`Schema`] - Registered entity types, link types, and properties
//! - [`Snapshot`] - Immutable point-in-time views with structural sharing
//! - [`Store`] / [`WriteTransaction`] - Versioned writes that report [`Mutation`]s
//! - [`StoreConfig`] - Snapshot retention settings
//!
//! [`Mutation`]: lodestore_foundation::Mutation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use config::StoreConfig;
pub use schema::Schema;
pub use snapshot::Snapshot;
pub use store::{Store, WriteTransaction};
