//! API surface errors.

use aviary_core::Scope;
use aviary_router::RouterError;

/// Errors surfaced to apps through the platform API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The calling context does not hold the required scope.
    ///
    /// Raised before any side effect of the attempted call.
    #[error("permission denied: scope '{scope}' not granted to this context")]
    PermissionDenied {
        /// The scope the call requires.
        scope: Scope,
    },

    /// The method exists in the API shape but has no implementation yet.
    #[error("not implemented: {method}")]
    NotImplemented {
        /// Fully-qualified method name, e.g. `apps.launch`.
        method: String,
    },

    /// A dispatch request was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A capability query failed in the router.
    #[error("router error: {0}")]
    Router(#[from] RouterError),

    /// Host-side wiring failure, not attributable to the app.
    #[error("internal API error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable error code, used across the guest boundary.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::PermissionDenied { .. } => "permission_denied",
            ApiError::NotImplemented { .. } => "not_implemented",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Router(_) => "router_error",
            ApiError::Internal(_) => "internal",
        }
    }

    pub(crate) fn not_implemented(method: &str) -> Self {
        ApiError::NotImplemented {
            method: method.to_string(),
        }
    }
}

/// Result alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
