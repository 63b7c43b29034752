//! The app orchestrator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use aviary_api::{AppSummary, AppsHost, ExecutionMode, PlatformApi};
use aviary_core::{AppConfig, AppId, ContextId};
use aviary_events::{EventBus, EventMetadata, PlatformEvent};
use aviary_router::{CapabilityMatcher, ServiceRegistry};
use aviary_sandbox::{ExecutionContext, SandboxExecutor};

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::permissions::PermissionManager;

const EVENT_SOURCE: &str = "runtime";

/// One running app.
struct RunningApp {
    config: AppConfig,
    context: ExecutionContext,
    started_at: DateTime<Utc>,
    started_instant: Instant,
}

/// Shared directory of running apps.
///
/// Backs both the orchestrator and the apps facade each context sees.
#[derive(Default)]
struct AppDirectory {
    apps: RwLock<HashMap<AppId, RunningApp>>,
}

#[async_trait]
impl AppsHost for AppDirectory {
    async fn list_apps(&self) -> Vec<AppSummary> {
        let apps = self.apps.read().await;
        apps.values()
            .map(|app| AppSummary {
                app_id: app.config.id.clone(),
                name: app.config.name.clone(),
                started_at: app.started_at,
                uptime: app.started_instant.elapsed(),
            })
            .collect()
    }
}

/// Orchestrates app lifecycles: validation, permissions, context creation,
/// execution, and teardown.
pub struct AppRuntime {
    executor: SandboxExecutor,
    matcher: Arc<CapabilityMatcher>,
    bus: EventBus,
    permissions: PermissionManager,
    directory: Arc<AppDirectory>,
    platform_name: String,
    platform_version: String,
}

impl AppRuntime {
    /// Build a runtime from config and the environment's service registry.
    #[must_use]
    pub fn new(config: &RuntimeConfig, registry: Arc<dyn ServiceRegistry>) -> Self {
        let bus = EventBus::new();
        let matcher = Arc::new(CapabilityMatcher::with_ttl(
            registry,
            bus.clone(),
            config.cache_ttl(),
        ));
        Self {
            executor: SandboxExecutor::new(config.sandbox_config()),
            matcher,
            bus,
            permissions: PermissionManager::new(config.policy()),
            directory: Arc::new(AppDirectory::default()),
            platform_name: config.platform.name.clone(),
            platform_version: config.platform.version.clone(),
        }
    }

    /// The platform event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The capability matcher.
    #[must_use]
    pub fn matcher(&self) -> &Arc<CapabilityMatcher> {
        &self.matcher
    }

    /// The sandbox executor.
    #[must_use]
    pub fn executor(&self) -> &SandboxExecutor {
        &self.executor
    }

    /// Validate, start, and run an app to completion.
    ///
    /// On success the app is recorded as running (until
    /// [`stop_app`](Self::stop_app)) and `app_started` is published. On any
    /// failure an `app_error` event is published before the error returns,
    /// and no partial state survives: a context created along the way is
    /// destroyed.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Validation`] for a malformed config (nothing
    /// started), [`RuntimeError::Permission`] for an ungranted scope,
    /// [`RuntimeError::AlreadyRunning`], and sandbox errors from module
    /// loading and execution.
    pub async fn execute_app(&self, config: AppConfig) -> RuntimeResult<Value> {
        let app_id = config.id.clone();
        match self.try_execute_app(config).await {
            Ok(value) => Ok(value),
            Err(e) => {
                // Observers hear about the failure before the caller does.
                self.bus.publish(PlatformEvent::AppError {
                    metadata: EventMetadata::new(EVENT_SOURCE),
                    app_id,
                    error: e.to_string(),
                });
                Err(e)
            },
        }
    }

    async fn try_execute_app(&self, config: AppConfig) -> RuntimeResult<Value> {
        config.validate()?;
        self.permissions.validate(&config.permissions)?;

        let app_id = config.id.clone();
        if self.directory.apps.read().await.contains_key(&app_id) {
            return Err(RuntimeError::AlreadyRunning { app_id });
        }

        let mode = if self.executor.config().sandboxed {
            ExecutionMode::Sandboxed
        } else {
            ExecutionMode::Trusted
        };
        let api = Arc::new(
            PlatformApi::new(
                app_id.clone(),
                config.permissions.iter().copied(),
                self.bus.clone(),
                Arc::clone(&self.matcher),
            )
            .with_mode(mode)
            .with_platform(self.platform_name.clone(), self.platform_version.clone())
            .with_apps_host(Arc::clone(&self.directory) as Arc<dyn AppsHost>),
        );

        let ctx = self
            .executor
            .create_context(app_id.clone(), config.permissions.clone(), api)?;

        let result = self
            .executor
            .execute(&ctx, &config.entrypoint, config.module_hash.as_deref())
            .await;
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                self.executor.destroy_context(&ctx);
                return Err(e.into());
            },
        };

        info!(app = %app_id, name = %config.name, "App started");
        let name = config.name.clone();
        {
            // Record before publishing so subscribers see the app as running.
            let mut apps = self.directory.apps.write().await;
            apps.insert(
                app_id.clone(),
                RunningApp {
                    config,
                    context: ctx,
                    started_at: Utc::now(),
                    started_instant: Instant::now(),
                },
            );
        }
        self.bus.publish(PlatformEvent::AppStarted {
            metadata: EventMetadata::new(EVENT_SOURCE),
            app_id,
            name,
        });
        Ok(value)
    }

    /// Stop a running app and destroy its context.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AppNotFound`] when the app is not running; runtime
    /// state is unchanged in that case.
    pub async fn stop_app(&self, app_id: &AppId) -> RuntimeResult<()> {
        let removed = {
            let mut apps = self.directory.apps.write().await;
            apps.remove(app_id)
        };
        let Some(app) = removed else {
            return Err(RuntimeError::AppNotFound {
                app_id: app_id.clone(),
            });
        };

        self.executor.destroy_context(&app.context);
        info!(app = %app_id, "App stopped");
        self.bus.publish(PlatformEvent::AppStopped {
            metadata: EventMetadata::new(EVENT_SOURCE),
            app_id: app_id.clone(),
        });
        Ok(())
    }

    /// Snapshot of running apps, uptime recomputed at call time.
    pub async fn running_apps(&self) -> Vec<AppSummary> {
        self.directory.list_apps().await
    }

    /// Whether an app is currently running.
    pub async fn is_running(&self, app_id: &AppId) -> bool {
        self.directory.apps.read().await.contains_key(app_id)
    }

    /// The live context id for an app, if it is running.
    pub async fn context_id(&self, app_id: &AppId) -> Option<ContextId> {
        self.directory
            .apps
            .read()
            .await
            .get(app_id)
            .map(|app| app.context.id())
    }

    /// Stop every app, then the executor. Best-effort: individual stop
    /// failures are logged and the loop continues.
    pub async fn shutdown(&self) {
        let ids: Vec<AppId> = {
            let apps = self.directory.apps.read().await;
            apps.keys().cloned().collect()
        };
        for app_id in ids {
            if let Err(e) = self.stop_app(&app_id).await {
                warn!(app = %app_id, error = %e, "Failed to stop app during shutdown");
            }
        }
        self.executor.shutdown();
        info!("Runtime shut down");
    }
}

impl std::fmt::Debug for AppRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRuntime")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
