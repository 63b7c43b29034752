//! Events facade.

use serde_json::Value;
use tracing::debug;

use aviary_core::Scope;
use aviary_events::{EventMetadata, EventReceiver, PlatformEvent};

use crate::api::PlatformApi;
use crate::error::{ApiError, ApiResult};

/// App-facing event operations, gated on [`Scope::Events`].
///
/// Emitted events are forced into the `app.{app_id}.` namespace, so an app
/// can never publish into `platform.*` or another app's namespace.
/// Subscriptions see only the `platform.` namespace. Unsubscribing is
/// dropping the returned receiver.
#[derive(Debug)]
pub struct EventsApi<'a> {
    api: &'a PlatformApi,
}

impl<'a> EventsApi<'a> {
    pub(crate) fn new(api: &'a PlatformApi) -> Self {
        Self { api }
    }

    /// Publish an app event under `app.{app_id}.{name}`.
    ///
    /// Returns the number of receivers the event reached.
    ///
    /// # Errors
    ///
    /// [`ApiError::PermissionDenied`] without [`Scope::Events`];
    /// [`ApiError::InvalidRequest`] for an empty event name.
    pub fn emit(&self, name: &str, data: Value) -> ApiResult<usize> {
        self.api.require(Scope::Events)?;
        if name.is_empty() {
            return Err(ApiError::InvalidRequest("event name is empty".to_string()));
        }
        let app_id = self.api.current_app();
        let topic = format!("app.{app_id}.{name}");
        debug!(app = %app_id, topic, "App emitting event");
        Ok(self.api.bus().publish(PlatformEvent::Custom {
            metadata: EventMetadata::new(app_id.as_str()),
            topic,
            data,
        }))
    }

    /// Subscribe to platform events named `name` (trailing `*` allowed).
    ///
    /// # Errors
    ///
    /// [`ApiError::PermissionDenied`] without [`Scope::Events`].
    pub fn subscribe(&self, name: &str) -> ApiResult<EventReceiver> {
        self.api.require(Scope::Events)?;
        Ok(self.api.bus().subscribe_topic(format!("platform.{name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aviary_core::AppId;
    use aviary_events::EventBus;
    use aviary_router::{CapabilityMatcher, StaticRegistry};
    use std::sync::Arc;

    fn api(scopes: impl IntoIterator<Item = Scope>) -> PlatformApi {
        let bus = EventBus::new();
        let matcher = Arc::new(CapabilityMatcher::new(
            Arc::new(StaticRegistry::new()),
            bus.clone(),
        ));
        PlatformApi::new(AppId::new("notes"), scopes, bus, matcher)
    }

    #[tokio::test]
    async fn emit_is_namespaced_to_app() {
        let api = api([Scope::Events]);
        let mut rx = api.bus().subscribe();

        api.events()
            .emit("saved", serde_json::json!({"count": 2}))
            .unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.topic(), "app.notes.saved");
        assert_eq!(event.metadata().source, "notes");
    }

    #[tokio::test]
    async fn emit_without_scope_has_no_side_effect() {
        let api = api([]);
        let mut rx = api.bus().subscribe();

        let err = api
            .events()
            .emit("saved", serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied { .. }));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn empty_event_name_rejected() {
        let api = api([Scope::Events]);
        let err = api.events().emit("", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn subscribe_sees_platform_namespace_only() {
        let api = api([Scope::Events]);
        let mut rx = api.events().subscribe("app.*").unwrap();

        // App-namespaced traffic does not reach platform subscriptions.
        api.events().emit("saved", serde_json::json!({})).unwrap();
        assert!(rx.try_recv().is_none());

        api.bus().publish(PlatformEvent::AppStopped {
            metadata: EventMetadata::new("runtime"),
            app_id: AppId::new("other"),
        });
        assert_eq!(rx.try_recv().unwrap().event_type(), "app_stopped");
    }

    #[tokio::test]
    async fn subscribe_without_scope_denied() {
        let api = api([Scope::Storage]);
        assert!(matches!(
            api.events().subscribe("app.started").unwrap_err(),
            ApiError::PermissionDenied { .. }
        ));
    }
}
