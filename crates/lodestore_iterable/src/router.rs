//! Routing committed mutations to the handles they invalidate.
//!
//! [`InvalidationIndex`] is the lookup side of a result cache: it knows
//! which handles have results somewhere, and answers which of them a
//! mutation could affect. Link mutations only consult handles that declare
//! the link type; everything else is checked against every handle. It
//! stores no results itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lodestore_foundation::{LinkId, Mutation};
use tracing::trace;

use crate::handle::EntityIterableHandle;

/// Handles registered for invalidation, indexed by the link types they
/// depend on.
#[derive(Debug, Default)]
pub struct InvalidationIndex {
    handles: HashMap<Arc<str>, Arc<EntityIterableHandle>>,
    by_link: HashMap<LinkId, HashSet<Arc<str>>>,
}

impl InvalidationIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle.
    ///
    /// An expired handle registered under the same key is replaced. Returns
    /// false if `handle` has expired or a live handle already holds its key.
    pub fn register(&mut self, handle: Arc<EntityIterableHandle>) -> bool {
        if handle.is_expired() {
            return false;
        }
        if let Some(existing) = self.handles.get(handle.string_handle()) {
            if !existing.is_expired() {
                return false;
            }
            trace!(key = %existing, "replacing expired handle");
            self.unregister(handle.string_handle());
        }
        let key = Arc::clone(handle.key());
        for link in handle.link_ids() {
            self.by_link
                .entry(*link)
                .or_default()
                .insert(Arc::clone(&key));
        }
        trace!(key = %key, "registered handle for invalidation");
        self.handles.insert(key, handle);
        true
    }

    /// Removes a handle by key, returning it if it was registered.
    pub fn unregister(&mut self, key: &str) -> Option<Arc<EntityIterableHandle>> {
        let handle = self.handles.remove(key)?;
        for link in handle.link_ids() {
            if let Some(keys) = self.by_link.get_mut(link) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_link.remove(link);
                }
            }
        }
        Some(handle)
    }

    /// Returns the number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no handle is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drops every expired handle. Returns how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        let expired: Vec<Arc<str>> = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.is_expired())
            .map(|(key, _)| Arc::clone(key))
            .collect();
        for key in &expired {
            self.unregister(key);
        }
        expired.len()
    }

    /// Returns the live handles whose results `mutation` could change,
    /// sorted by key.
    #[must_use]
    pub fn affected(&self, mutation: &Mutation) -> Vec<Arc<EntityIterableHandle>> {
        let mut hits: Vec<Arc<EntityIterableHandle>> = match mutation.link() {
            Some(link) => self
                .by_link
                .get(&link)
                .into_iter()
                .flatten()
                .filter_map(|key| self.handles.get(key))
                .filter(|handle| !handle.is_expired() && handle.matches(mutation))
                .cloned()
                .collect(),
            None => self
                .handles
                .values()
                .filter(|handle| !handle.is_expired() && handle.matches(mutation))
                .cloned()
                .collect(),
        };
        hits.sort_by(|a, b| a.string_handle().cmp(b.string_handle()));
        hits
    }
}
