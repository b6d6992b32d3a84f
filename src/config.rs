/// Configuration for a [`ClusterStore`](crate::ClusterStore)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of recompute-and-reassign rounds a single
    /// `reassign_all` call may run. A guard against oscillation, not a
    /// convergence proof.
    pub max_reassign_rounds: usize,

    /// Delete clusters that become empty after `remove` or `reassign_all`.
    /// When false (the reference behavior), emptied clusters persist as
    /// degenerate clusters with an undefined centroid.
    pub prune_empty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_reassign_rounds: 10,
            prune_empty: false,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of stabilization rounds
    pub fn with_max_reassign_rounds(mut self, rounds: usize) -> Self {
        self.max_reassign_rounds = rounds;
        self
    }

    /// Enable or disable pruning of emptied clusters
    pub fn with_prune_empty(mut self, prune: bool) -> Self {
        self.prune_empty = prune;
        self
    }
}
