//! Capability facade.

use serde_json::Value;

use aviary_core::Scope;
use aviary_router::{Requirements, ScoredServer};

use crate::api::PlatformApi;
use crate::error::{ApiError, ApiResult};

/// App-facing capability queries, gated on [`Scope::Capabilities`].
///
/// Queries proxy the capability matcher; invoking a provider is not part of
/// this surface (providers are called through the external registry, not
/// from app code).
#[derive(Debug)]
pub struct CapabilitiesApi<'a> {
    api: &'a PlatformApi,
}

impl<'a> CapabilitiesApi<'a> {
    pub(crate) fn new(api: &'a PlatformApi) -> Self {
        Self { api }
    }

    /// Ranked servers providing `capability`, best first.
    ///
    /// # Errors
    ///
    /// [`ApiError::PermissionDenied`] without [`Scope::Capabilities`];
    /// [`ApiError::Router`] when the registry query fails.
    pub async fn list_servers(&self, capability: &str) -> ApiResult<Vec<ScoredServer>> {
        self.api.require(Scope::Capabilities)?;
        Ok(self
            .api
            .matcher()
            .find_servers_for_capability(capability, &Requirements::default())
            .await?)
    }

    /// Whether any server currently provides `capability`.
    ///
    /// # Errors
    ///
    /// [`ApiError::PermissionDenied`] without [`Scope::Capabilities`];
    /// [`ApiError::Router`] when the registry query fails.
    pub async fn is_available(&self, capability: &str) -> ApiResult<bool> {
        self.api.require(Scope::Capabilities)?;
        Ok(self.api.matcher().is_capability_available(capability).await?)
    }

    /// Invoke a capability provider.
    ///
    /// # Errors
    ///
    /// Always [`ApiError::NotImplemented`] (after the scope check):
    /// provider invocation is owned by the hosting environment.
    pub async fn call(&self, _capability: &str, _params: Value) -> ApiResult<Value> {
        self.api.require(Scope::Capabilities)?;
        Err(ApiError::not_implemented("capabilities.call"))
    }
}
