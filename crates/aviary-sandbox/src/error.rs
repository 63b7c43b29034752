//! Sandbox errors.

use std::path::PathBuf;

use aviary_core::{AppId, ContextId};

/// Errors raised while creating contexts or executing app code.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Execution exceeded the configured limit. The isolate is terminated,
    /// not left running.
    #[error("execution timed out and the isolate was terminated")]
    Timeout,

    /// App code failed during execution.
    #[error("execution failed: {message}")]
    ExecutionFailed {
        /// Guest-reported error message.
        message: String,
        /// Guest stack trace, when one was captured.
        stack: Option<String>,
    },

    /// The app already has a live execution context.
    #[error("app '{app_id}' already has a live execution context")]
    ContextExists {
        /// The app with the existing context.
        app_id: AppId,
    },

    /// No context with this id is known to the executor.
    #[error("execution context '{context_id}' not found")]
    ContextNotFound {
        /// The unknown context id.
        context_id: ContextId,
    },

    /// The module could not be loaded.
    #[error("failed to load module {path}: {message}")]
    ModuleLoad {
        /// Path of the module that failed to load.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Module bytes do not match the expected blake3 hash.
    #[error("module hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// The hash the config declared.
        expected: String,
        /// The hash of the bytes actually read.
        actual: String,
    },

    /// Isolate or worker plumbing failure, not attributable to app code.
    #[error("isolate error: {0}")]
    Isolate(String),
}

/// Result alias for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
