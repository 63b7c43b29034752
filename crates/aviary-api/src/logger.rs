//! App-scoped structured logging.

use aviary_core::AppId;
use tracing::{debug, error, info, warn};

/// Logger handed to app code; every record carries the app id.
///
/// Unprivileged: logging needs no scope.
#[derive(Debug, Clone)]
pub struct AppLogger {
    app_id: AppId,
}

impl AppLogger {
    pub(crate) fn new(app_id: AppId) -> Self {
        Self { app_id }
    }

    /// Log at debug level.
    pub fn debug(&self, message: &str) {
        debug!(app = %self.app_id, "{message}");
    }

    /// Log at info level.
    pub fn info(&self, message: &str) {
        info!(app = %self.app_id, "{message}");
    }

    /// Log at warn level.
    pub fn warn(&self, message: &str) {
        warn!(app = %self.app_id, "{message}");
    }

    /// Log at error level.
    pub fn error(&self, message: &str) {
        error!(app = %self.app_id, "{message}");
    }
}
