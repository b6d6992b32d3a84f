use thiserror::Error;

/// Error types for the cluster store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Seeding was attempted with no vectors
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// The store has already been seeded with initial clusters
    #[error("Store is already initialized with {0} clusters")]
    AlreadyInitialized(usize),

    /// The store has no clusters yet
    #[error("Store has not been seeded. Call seed() first.")]
    NotInitialized,

    /// Feature arity does not match the store or cluster
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// No nearest cluster could be determined. Unreachable while the
    /// cluster set is non-empty; kept as a defensive variant.
    #[error("No cluster found for candidate vector")]
    NoClusterFound,
}
