//! Lazy entity iterables, structural handles, and cache invalidation for Lodestore.
//!
//! This crate provides:
//! - [`QueryArena`] - The DAG of iterable nodes built for one query session
//! - [`IterableKind`] / [`IterableType`] - What each node computes, and its type tag
//! - [`EntityIterableHandle`] - Reproducible cache keys and mutation predicates
//! - [`EntityIterator`] - Snapshot-bound pull iterators with single-use disposal
//! - [`InvalidationIndex`] - Routing committed mutations to affected handles
//! - [`IterationConfig`] - Materialization limits and node deduplication
//!
//! # Example
//!
//! ```
//! use lodestore_iterable::QueryArena;
//! use lodestore_storage::Store;
//!
//! let mut store = Store::default();
//! let issue = store.register_entity_type("Issue").unwrap();
//! let user = store.register_entity_type("User").unwrap();
//! let assignee = store.register_link_type("assignee").unwrap();
//!
//! let mut txn = store.begin_write();
//! let bug = txn.create_entity(issue).unwrap();
//! let alice = txn.create_entity(user).unwrap();
//! txn.set_link(bug, assignee, alice).unwrap();
//! store.commit(txn).unwrap();
//!
//! let snapshot = store.snapshot();
//! let mut arena = QueryArena::for_snapshot(&snapshot);
//! let issues = arena.all_entities(issue).unwrap();
//! let just_alice = arena.single_entity(alice).unwrap();
//! let hers = arena.filter_links(assignee, issues, just_alice).unwrap();
//!
//! assert_eq!(arena.to_vec(hers, &snapshot).unwrap(), vec![bug]);
//! assert!(!arena.can_be_cached(hers).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod arena;
pub mod config;
mod cursor;
mod filter_links;
pub mod handle;
pub mod iterable;
pub mod iterable_type;
pub mod iterator;
mod parse;
pub mod router;

pub use arena::QueryArena;
pub use config::IterationConfig;
pub use handle::{EntityIterableHandle, HandleBuilder};
pub use iterable::{IterableId, IterableKind, IterableNode};
pub use iterable_type::IterableType;
pub use iterator::EntityIterator;
pub use router::InvalidationIndex;
