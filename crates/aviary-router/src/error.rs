//! Router error types.

use thiserror::Error;

/// Errors from capability matching.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The service registry could not be queried.
    #[error("registry query failed: {0}")]
    Registry(String),

    /// A preference weight was outside `[0, 1]`.
    #[error("invalid preference weight {weight} for server {server}")]
    InvalidPreference {
        /// The server the weight was set for.
        server: String,
        /// The rejected weight.
        weight: f64,
    },

    /// Shared matcher state was unavailable (poisoned lock).
    #[error("matcher state unavailable: {0}")]
    Internal(String),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
