//! Storage Errors
//!
//! Error types raised by collection adapters.

/// Errors that can occur in a collection adapter
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An index with the same keys exists with different options
    #[error("Index {name} already exists with different options")]
    IndexConflict { name: String },

    /// Index could not be brought to a valid state
    #[error("Index {name} is invalid after rebuilding")]
    InvalidIndex { name: String },

    /// Pipeline shape the adapter cannot execute
    #[error("Unsupported pipeline: {0}")]
    UnsupportedPipeline(String),

    /// Aggregated value does not fit the result type
    #[error("Arithmetic overflow while aggregating group {0}")]
    Overflow(i64),

    /// Adapter state is unusable (e.g. a poisoned lock)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
