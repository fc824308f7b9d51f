//! Shared expiry tokens for snapshots and query sessions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable flag that flips from live to expired exactly once.
///
/// All clones observe the same state. Snapshots carry one per store
/// version; query sessions carry one for the handles they build.
#[derive(Clone, Default)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// Creates a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token expired. Returns true if it was live before.
    pub fn expire(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Returns true once [`Liveness::expire`] has been called on any clone.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns true if both tokens share the same flag.
    #[must_use]
    pub fn same_as(&self, other: &Liveness) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_expired() {
            write!(f, "Liveness(expired)")
        } else {
            write!(f, "Liveness(live)")
        }
    }
}
