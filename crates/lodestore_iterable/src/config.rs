//! Configuration for query arenas.

/// Configuration for a [`QueryArena`](crate::QueryArena).
///
/// Controls materialization limits and node deduplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationConfig {
    /// Largest entity set a single materialization may build.
    ///
    /// `None` means unbounded. Exceeding the limit fails the pull that
    /// triggered materialization; there is no fallback to per-candidate
    /// evaluation.
    pub max_materialized_set: Option<usize>,

    /// Whether constructing a node whose handle key already exists returns
    /// the existing node instead of a new one.
    pub deduplicate_nodes: bool,

    /// Deepest decorator nesting a node may have. Leaves have depth 1.
    ///
    /// Building, parsing and iterating all walk the tree recursively, so
    /// deeper nodes are rejected with `LimitExceeded`.
    pub max_nesting_depth: usize,
}

/// Default for [`IterationConfig::max_nesting_depth`].
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_materialized_set: None,
            deduplicate_nodes: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl IterationConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that bounds materialized sets.
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        Self {
            max_materialized_set: Some(limit),
            ..Self::default()
        }
    }

    /// Builder method to set the materialization limit.
    #[must_use]
    pub fn with_max_materialized_set(mut self, limit: Option<usize>) -> Self {
        self.max_materialized_set = limit;
        self
    }

    /// Builder method to enable/disable node deduplication.
    #[must_use]
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate_nodes = enabled;
        self
    }

    /// Builder method to set the nesting bound.
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}
