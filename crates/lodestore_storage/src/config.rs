//! Configuration for the store.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`Store`](crate::Store).
///
/// Controls how many superseded snapshot versions stay readable.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoreConfig {
    /// Number of past versions kept live after newer commits.
    ///
    /// When a commit pushes the history past this bound, the oldest
    /// snapshots expire and reads through them fail.
    pub retained_versions: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retained_versions: 16,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration where only the current version is readable.
    #[must_use]
    pub fn latest_only() -> Self {
        Self {
            retained_versions: 0,
        }
    }

    /// Builder method to set the number of retained versions.
    #[must_use]
    pub fn with_retained_versions(mut self, versions: usize) -> Self {
        self.retained_versions = versions;
        self
    }
}
