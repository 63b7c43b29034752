//! The sandbox executor.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use aviary_api::{ApiDispatcher, ExecutionMode, PlatformApi};
use aviary_core::{AppId, ContextId, Scope};

use crate::config::SandboxConfig;
use crate::context::ExecutionContext;
use crate::error::{SandboxError, SandboxResult};
use crate::isolate::{Instruction, IsolateHandle, spawn_isolate};
use crate::trusted::{AmbientGuard, TrustedEntrypoints};

/// Backend owned by the executor for one live context.
enum ContextBackend {
    Isolate(IsolateHandle),
    Trusted,
}

#[derive(Default)]
struct ExecutorState {
    backends: HashMap<ContextId, ContextBackend>,
    by_app: HashMap<AppId, ContextId>,
}

/// Creates execution contexts and runs app code inside them.
///
/// In sandboxed mode each context owns a dedicated worker thread running a
/// WASM isolate; in trusted mode code runs natively in-process. Exactly one
/// live context is allowed per app id.
pub struct SandboxExecutor {
    config: SandboxConfig,
    trusted: TrustedEntrypoints,
    state: Mutex<ExecutorState>,
}

impl SandboxExecutor {
    /// Create an executor with the given configuration.
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            trusted: TrustedEntrypoints::new(),
            state: Mutex::new(ExecutorState::default()),
        }
    }

    /// The executor's configuration.
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Registry of native entrypoints for the trusted path.
    #[must_use]
    pub fn trusted_entrypoints(&self) -> &TrustedEntrypoints {
        &self.trusted
    }

    /// Create a fresh execution context for an app.
    ///
    /// # Errors
    ///
    /// [`SandboxError::ContextExists`] when the app already has a live
    /// context; [`SandboxError::Isolate`] when the worker cannot be set up.
    pub fn create_context(
        &self,
        app_id: AppId,
        scopes: Vec<Scope>,
        api: Arc<PlatformApi>,
    ) -> SandboxResult<ExecutionContext> {
        let mode = if self.config.sandboxed {
            ExecutionMode::Sandboxed
        } else {
            ExecutionMode::Trusted
        };
        let ctx = ExecutionContext::new(app_id.clone(), scopes.clone(), api, mode);

        let backend = if self.config.sandboxed {
            let runtime_handle = tokio::runtime::Handle::try_current()
                .map_err(|e| SandboxError::Isolate(format!("no tokio runtime: {e}")))?;
            let dispatcher = Arc::new(ApiDispatcher::new(Arc::clone(ctx.api())));
            ContextBackend::Isolate(spawn_isolate(
                app_id.clone(),
                scopes,
                dispatcher,
                self.config.clone(),
                runtime_handle,
            ))
        } else {
            ContextBackend::Trusted
        };

        let mut state = self.state()?;
        if let Some(existing) = state.by_app.get(&app_id) {
            debug!(app = %app_id, context = %existing, "Rejected second context for app");
            if let ContextBackend::Isolate(handle) = backend {
                handle.shutdown();
            }
            return Err(SandboxError::ContextExists { app_id });
        }
        state.by_app.insert(app_id.clone(), ctx.id());
        state.backends.insert(ctx.id(), backend);
        drop(state);

        info!(app = %app_id, context = %ctx.id(), ?mode, "Execution context created");
        Ok(ctx)
    }

    /// Run the app's entrypoint to completion inside its context.
    ///
    /// One instruction, one reply. On timeout the isolate is terminated and
    /// the context's worker torn down, never left running.
    ///
    /// # Errors
    ///
    /// [`SandboxError::ContextNotFound`] for a destroyed or foreign context;
    /// [`SandboxError::Timeout`] past the configured limit;
    /// [`SandboxError::ExecutionFailed`] when app code fails; module load
    /// and hash errors as raised by the loader.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        entrypoint: &Path,
        expected_hash: Option<&str>,
    ) -> SandboxResult<Value> {
        let is_isolate = {
            let state = self.state()?;
            match state.backends.get(&ctx.id()) {
                Some(ContextBackend::Isolate(_)) => true,
                Some(ContextBackend::Trusted) => false,
                None => {
                    return Err(SandboxError::ContextNotFound {
                        context_id: ctx.id(),
                    });
                },
            }
        };

        if is_isolate {
            self.execute_isolated(ctx, entrypoint, expected_hash).await
        } else {
            self.execute_trusted(ctx, entrypoint).await
        }
    }

    async fn execute_isolated(
        &self,
        ctx: &ExecutionContext,
        entrypoint: &Path,
        expected_hash: Option<&str>,
    ) -> SandboxResult<Value> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let state = self.state()?;
            let Some(ContextBackend::Isolate(handle)) = state.backends.get(&ctx.id()) else {
                return Err(SandboxError::ContextNotFound {
                    context_id: ctx.id(),
                });
            };
            handle.send(Instruction::Execute {
                entrypoint: entrypoint.to_path_buf(),
                expected_hash: expected_hash.map(ToString::to_string),
                reply: reply_tx,
            })?;
        }

        match tokio::time::timeout(self.config.execution_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_closed)) => Err(SandboxError::Isolate(
                "worker dropped the reply channel".to_string(),
            )),
            Err(_elapsed) => {
                warn!(
                    app = %ctx.app_id(),
                    context = %ctx.id(),
                    timeout = ?self.config.execution_timeout,
                    "Execution timed out, terminating isolate"
                );
                self.teardown(ctx.id());
                Err(SandboxError::Timeout)
            },
        }
    }

    async fn execute_trusted(
        &self,
        ctx: &ExecutionContext,
        entrypoint: &Path,
    ) -> SandboxResult<Value> {
        let code = self
            .trusted
            .get(entrypoint)
            .ok_or_else(|| SandboxError::ModuleLoad {
                path: entrypoint.to_path_buf(),
                message: "no trusted entrypoint registered for this path".to_string(),
            })?;

        let api = Arc::clone(ctx.api());
        let _guard = AmbientGuard::install(ctx.id(), Arc::clone(&api));
        match tokio::time::timeout(self.config.execution_timeout, code.run(api)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(SandboxError::ExecutionFailed {
                message,
                stack: None,
            }),
            Err(_elapsed) => Err(SandboxError::Timeout),
        }
    }

    /// Destroy a context: cancel any in-flight call, stop the worker,
    /// release the app's slot. Destroying an already-destroyed context is a
    /// no-op.
    pub fn destroy_context(&self, ctx: &ExecutionContext) {
        self.teardown(ctx.id());
    }

    /// Whether a context is still live.
    #[must_use]
    pub fn has_context(&self, context_id: ContextId) -> bool {
        self.state
            .lock()
            .map(|s| s.backends.contains_key(&context_id))
            .unwrap_or(false)
    }

    /// Destroy every live context.
    pub fn shutdown(&self) {
        let ids: Vec<ContextId> = self
            .state
            .lock()
            .map(|s| s.backends.keys().copied().collect())
            .unwrap_or_default();
        for id in ids {
            self.teardown(id);
        }
    }

    fn teardown(&self, context_id: ContextId) {
        let backend = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.by_app.retain(|_, id| *id != context_id);
            state.backends.remove(&context_id)
        };
        match backend {
            Some(ContextBackend::Isolate(handle)) => {
                handle.shutdown();
                info!(context = %context_id, "Execution context destroyed");
            },
            Some(ContextBackend::Trusted) => {
                info!(context = %context_id, "Execution context destroyed");
            },
            None => {},
        }
    }

    fn state(&self) -> SandboxResult<MutexGuard<'_, ExecutorState>> {
        self.state
            .lock()
            .map_err(|e| SandboxError::Isolate(format!("executor state poisoned: {e}")))
    }
}

impl std::fmt::Debug for SandboxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live = self.state.lock().map(|s| s.backends.len()).unwrap_or(0);
        f.debug_struct("SandboxExecutor")
            .field("config", &self.config)
            .field("live_contexts", &live)
            .finish_non_exhaustive()
    }
}
