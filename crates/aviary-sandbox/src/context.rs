//! Execution contexts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aviary_api::{ExecutionMode, PlatformApi};
use aviary_core::{AppId, ContextId, Scope};

/// One app's execution environment.
///
/// Created and destroyed exclusively through the
/// [`SandboxExecutor`](crate::SandboxExecutor); at most one live context
/// exists per app id. The context carries its own API handle, so the app
/// identity never travels through global state.
pub struct ExecutionContext {
    id: ContextId,
    app_id: AppId,
    scopes: Vec<Scope>,
    api: Arc<PlatformApi>,
    mode: ExecutionMode,
    created_at: Instant,
}

impl ExecutionContext {
    pub(crate) fn new(
        app_id: AppId,
        scopes: Vec<Scope>,
        api: Arc<PlatformApi>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            id: ContextId::generate(),
            app_id,
            scopes,
            api,
            mode,
            created_at: Instant::now(),
        }
    }

    /// Unique context id.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The app this context belongs to.
    #[must_use]
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Scopes granted to this context.
    #[must_use]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// The API handle bound to this context.
    #[must_use]
    pub fn api(&self) -> &Arc<PlatformApi> {
        &self.api
    }

    /// How this context executes code.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Time since the context was created.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("app_id", &self.app_id)
            .field("scopes", &self.scopes)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
