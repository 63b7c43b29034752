//! The per-context API handle.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use aviary_core::{AppId, Scope};
use aviary_events::EventBus;
use aviary_router::CapabilityMatcher;

use crate::apps::{AppsApi, AppsHost};
use crate::capabilities::CapabilitiesApi;
use crate::error::{ApiError, ApiResult};
use crate::events::EventsApi;
use crate::logger::AppLogger;

/// How the owning context executes app code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Code runs inside a WASM isolate.
    Sandboxed,
    /// Code runs natively in-process (development only).
    Trusted,
}

/// Static facts about the platform, readable without any scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Platform name.
    pub name: String,
    /// Platform version.
    pub version: String,
    /// Execution mode of the calling context.
    pub mode: ExecutionMode,
    /// Names of the API facades this handle exposes.
    pub apis: Vec<String>,
}

/// The API surface handed to exactly one execution context.
///
/// Bound to a single app id at construction; the binding is carried
/// explicitly on the handle rather than through any process-global state,
/// so concurrent contexts cannot observe each other's identity. Every
/// privileged facade checks the context's scope set before performing any
/// side effect.
pub struct PlatformApi {
    app_id: AppId,
    scopes: HashSet<Scope>,
    mode: ExecutionMode,
    platform_name: String,
    platform_version: String,
    bus: EventBus,
    matcher: Arc<CapabilityMatcher>,
    apps_host: Option<Arc<dyn AppsHost>>,
}

impl PlatformApi {
    /// Bind an API handle to one app and its granted scopes.
    #[must_use]
    pub fn new(
        app_id: AppId,
        scopes: impl IntoIterator<Item = Scope>,
        bus: EventBus,
        matcher: Arc<CapabilityMatcher>,
    ) -> Self {
        Self {
            app_id,
            scopes: scopes.into_iter().collect(),
            mode: ExecutionMode::Sandboxed,
            platform_name: "aviary".to_string(),
            platform_version: env!("CARGO_PKG_VERSION").to_string(),
            bus,
            matcher,
            apps_host: None,
        }
    }

    /// Override the platform identity reported by
    /// [`platform_info`](Self::platform_info).
    #[must_use]
    pub fn with_platform(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.platform_name = name.into();
        self.platform_version = version.into();
        self
    }

    /// Set the execution mode reported by [`platform_info`](Self::platform_info).
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Attach the host backing the apps facade.
    #[must_use]
    pub fn with_apps_host(mut self, host: Arc<dyn AppsHost>) -> Self {
        self.apps_host = Some(host);
        self
    }

    /// Static platform facts. Unprivileged.
    #[must_use]
    pub fn platform_info(&self) -> PlatformInfo {
        PlatformInfo {
            name: self.platform_name.clone(),
            version: self.platform_version.clone(),
            mode: self.mode,
            apis: vec![
                "platform".to_string(),
                "events".to_string(),
                "capabilities".to_string(),
                "apps".to_string(),
                "log".to_string(),
                "util".to_string(),
            ],
        }
    }

    /// The app this handle is bound to. Unprivileged.
    #[must_use]
    pub fn current_app(&self) -> &AppId {
        &self.app_id
    }

    /// Events facade. Calls require [`Scope::Events`].
    #[must_use]
    pub fn events(&self) -> EventsApi<'_> {
        EventsApi::new(self)
    }

    /// Capability facade. Calls require [`Scope::Capabilities`].
    #[must_use]
    pub fn capabilities(&self) -> CapabilitiesApi<'_> {
        CapabilitiesApi::new(self)
    }

    /// Apps facade. Calls require [`Scope::Apps`].
    #[must_use]
    pub fn apps(&self) -> AppsApi<'_> {
        AppsApi::new(self)
    }

    /// Structured logger scoped to this app. Unprivileged.
    #[must_use]
    pub fn logger(&self) -> AppLogger {
        AppLogger::new(self.app_id.clone())
    }

    /// Fail unless the context holds `scope`.
    pub(crate) fn require(&self, scope: Scope) -> ApiResult<()> {
        if self.scopes.contains(&scope) {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied { scope })
        }
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn matcher(&self) -> &CapabilityMatcher {
        &self.matcher
    }

    pub(crate) fn apps_host(&self) -> Option<&Arc<dyn AppsHost>> {
        self.apps_host.as_ref()
    }
}

impl std::fmt::Debug for PlatformApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformApi")
            .field("app_id", &self.app_id)
            .field("scopes", &self.scopes)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
