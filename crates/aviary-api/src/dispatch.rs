//! Serialized API dispatch for the guest boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::trace;

use crate::api::PlatformApi;
use crate::error::{ApiError, ApiResult};
use crate::util;

/// One API call as serialized by a guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Fully-qualified method name, e.g. `events.emit`.
    pub method: String,
    /// Method parameters; defaults to `null`.
    #[serde(default)]
    pub params: Value,
}

/// Routes serialized `{method, params}` requests onto a [`PlatformApi`].
///
/// This is the only API path code inside an isolate can reach; the same
/// permission checks apply as on the native facades, so nothing is gained
/// by crafting raw requests. Subscription methods are not dispatchable
/// (receivers cannot cross the guest boundary), and of the utilities only
/// `util.unique_id` is exposed: [`util::delay`] and [`util::debounce`] are
/// trusted-path-only, since a guest awaiting them would pin the isolate's
/// host-call thread for the whole wait.
pub struct ApiDispatcher {
    api: Arc<PlatformApi>,
}

impl ApiDispatcher {
    /// Wrap an API handle for serialized dispatch.
    #[must_use]
    pub fn new(api: Arc<PlatformApi>) -> Self {
        Self { api }
    }

    /// The wrapped API handle.
    #[must_use]
    pub fn api(&self) -> &Arc<PlatformApi> {
        &self.api
    }

    /// Dispatch one request.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for malformed params,
    /// [`ApiError::NotImplemented`] for unknown methods, plus whatever the
    /// target facade raises.
    pub async fn dispatch(&self, request: ApiRequest) -> ApiResult<Value> {
        trace!(app = %self.api.current_app(), method = %request.method, "Dispatching API request");
        match request.method.as_str() {
            "platform.info" => to_value(self.api.platform_info()),
            "platform.current_app" => Ok(json!(self.api.current_app().as_str())),
            "events.emit" => {
                let params: EmitParams = from_params(request.params)?;
                let receivers = self.api.events().emit(&params.name, params.data)?;
                Ok(json!({ "receivers": receivers }))
            },
            "capabilities.list_servers" => {
                let params: CapabilityParams = from_params(request.params)?;
                let servers = self.api.capabilities().list_servers(&params.capability).await?;
                to_value(servers)
            },
            "capabilities.is_available" => {
                let params: CapabilityParams = from_params(request.params)?;
                let available = self.api.capabilities().is_available(&params.capability).await?;
                Ok(json!(available))
            },
            "capabilities.call" => {
                let params: CapabilityCallParams = from_params(request.params)?;
                self.api.capabilities().call(&params.capability, params.params).await
            },
            "apps.list" => to_value(self.api.apps().list().await?),
            "log.debug" | "log.info" | "log.warn" | "log.error" => {
                let params: LogParams = from_params(request.params)?;
                let logger = self.api.logger();
                match request.method.as_str() {
                    "log.debug" => logger.debug(&params.message),
                    "log.info" => logger.info(&params.message),
                    "log.warn" => logger.warn(&params.message),
                    _ => logger.error(&params.message),
                }
                Ok(Value::Null)
            },
            "util.unique_id" => Ok(json!(util::unique_id())),
            other => Err(ApiError::NotImplemented {
                method: other.to_string(),
            }),
        }
    }

    /// Dispatch a JSON-encoded request, always producing a JSON reply.
    ///
    /// Shape: `{"ok": <value>}` on success, `{"error": {"code", "message"}}`
    /// on failure. Never fails: encode errors are themselves reported
    /// through the error shape.
    pub async fn dispatch_json(&self, payload: &str) -> String {
        let reply = match serde_json::from_str::<ApiRequest>(payload) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(ApiError::InvalidRequest(e.to_string())),
        };
        let body = match reply {
            Ok(value) => json!({ "ok": value }),
            Err(e) => json!({ "error": { "code": e.code(), "message": e.to_string() } }),
        };
        body.to_string()
    }
}

impl std::fmt::Debug for ApiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiDispatcher")
            .field("app_id", self.api.current_app())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct EmitParams {
    name: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct CapabilityParams {
    capability: String,
}

#[derive(Deserialize)]
struct CapabilityCallParams {
    capability: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct LogParams {
    message: String,
}

fn from_params<T: serde::de::DeserializeOwned>(params: Value) -> ApiResult<T> {
    serde_json::from_value(params).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}
