//! Lodestore - Lazy, cacheable entity queries over a versioned entity store
//!
//! This crate re-exports all layers of the Lodestore system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: lodestore_iterable   - Query arena, handles, filter links, invalidation
//! Layer 1: lodestore_storage    - Schema, snapshots, write transactions
//! Layer 0: lodestore_foundation - Core types (EntityId, EntityIdSet, Mutation, Error)
//! ```

pub use lodestore_foundation as foundation;
pub use lodestore_iterable as iterable;
pub use lodestore_storage as storage;
