//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Input errors raised before any storage access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Create payload is incomplete (`timestamp` or `sum` unset)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required query parameter is absent or not an integer
    #[error("Missing or invalid parameter: {0}")]
    MissingParameter(&'static str),
}
