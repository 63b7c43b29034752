//! Apps facade and the host trait backing it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aviary_core::{AppId, Scope};

use crate::api::PlatformApi;
use crate::error::{ApiError, ApiResult};

/// One running app, as reported to other apps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    /// The app's identifier.
    pub app_id: AppId,
    /// Human-readable name.
    pub name: String,
    /// When the app started.
    pub started_at: DateTime<Utc>,
    /// Time since start, recomputed at snapshot time.
    pub uptime: Duration,
}

/// Orchestrator-side backing for the apps facade.
///
/// Declared here and implemented by the runtime so the facade can reach
/// orchestrator state without a crate cycle.
#[async_trait]
pub trait AppsHost: Send + Sync {
    /// Snapshot of currently running apps.
    async fn list_apps(&self) -> Vec<AppSummary>;
}

/// App-facing app management, gated on [`Scope::Apps`].
#[derive(Debug)]
pub struct AppsApi<'a> {
    api: &'a PlatformApi,
}

impl<'a> AppsApi<'a> {
    pub(crate) fn new(api: &'a PlatformApi) -> Self {
        Self { api }
    }

    /// Snapshot of currently running apps.
    ///
    /// # Errors
    ///
    /// [`ApiError::PermissionDenied`] without [`Scope::Apps`];
    /// [`ApiError::Internal`] when no host was attached to this handle.
    pub async fn list(&self) -> ApiResult<Vec<AppSummary>> {
        self.api.require(Scope::Apps)?;
        let host = self
            .api
            .apps_host()
            .ok_or_else(|| ApiError::Internal("no apps host attached".to_string()))?;
        Ok(host.list_apps().await)
    }

    /// Launch another app.
    ///
    /// # Errors
    ///
    /// Always [`ApiError::NotImplemented`] after the scope check.
    pub async fn launch(&self, _app_id: &AppId) -> ApiResult<()> {
        self.api.require(Scope::Apps)?;
        Err(ApiError::not_implemented("apps.launch"))
    }

    /// Send a message to another app.
    ///
    /// # Errors
    ///
    /// Always [`ApiError::NotImplemented`] after the scope check.
    pub async fn send_message(&self, _app_id: &AppId, _message: Value) -> ApiResult<()> {
        self.api.require(Scope::Apps)?;
        Err(ApiError::not_implemented("apps.send_message"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aviary_events::EventBus;
    use aviary_router::{CapabilityMatcher, StaticRegistry};
    use std::sync::Arc;

    struct FixedHost(Vec<AppSummary>);

    #[async_trait]
    impl AppsHost for FixedHost {
        async fn list_apps(&self) -> Vec<AppSummary> {
            self.0.clone()
        }
    }

    fn api(scopes: impl IntoIterator<Item = Scope>) -> PlatformApi {
        let bus = EventBus::new();
        let matcher = Arc::new(CapabilityMatcher::new(
            Arc::new(StaticRegistry::new()),
            bus.clone(),
        ));
        PlatformApi::new(AppId::new("notes"), scopes, bus, matcher)
    }

    #[tokio::test]
    async fn list_reads_from_host() {
        let host = Arc::new(FixedHost(vec![AppSummary {
            app_id: AppId::new("tasks"),
            name: "Tasks".to_string(),
            started_at: Utc::now(),
            uptime: Duration::from_secs(5),
        }]));
        let api = api([Scope::Apps]).with_apps_host(host);

        let apps = api.apps().list().await.unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].app_id, AppId::new("tasks"));
    }

    #[tokio::test]
    async fn list_denied_without_scope() {
        let api = api([]);
        assert!(matches!(
            api.apps().list().await.unwrap_err(),
            ApiError::PermissionDenied { .. }
        ));
    }

    #[tokio::test]
    async fn list_without_host_is_internal_error() {
        let api = api([Scope::Apps]);
        assert!(matches!(
            api.apps().list().await.unwrap_err(),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn launch_and_message_not_implemented() {
        let api = api([Scope::Apps]);
        assert!(matches!(
            api.apps().launch(&AppId::new("tasks")).await.unwrap_err(),
            ApiError::NotImplemented { .. }
        ));
        assert!(matches!(
            api.apps()
                .send_message(&AppId::new("tasks"), serde_json::json!({}))
                .await
                .unwrap_err(),
            ApiError::NotImplemented { .. }
        ));
    }
}
