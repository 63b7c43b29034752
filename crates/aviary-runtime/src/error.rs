//! Runtime errors.

use aviary_core::{AppId, ValidationError};
use aviary_sandbox::SandboxError;

use crate::permissions::PermissionError;

/// Errors raised by the app orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The app config is malformed. Nothing was started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The app declares a scope the policy does not grant.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Context creation or execution failed.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// No running app with this id.
    #[error("app '{app_id}' is not running")]
    AppNotFound {
        /// The unknown app.
        app_id: AppId,
    },

    /// The app is already running.
    #[error("app '{app_id}' is already running")]
    AlreadyRunning {
        /// The running app.
        app_id: AppId,
    },
}

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
