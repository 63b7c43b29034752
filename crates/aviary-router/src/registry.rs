//! Service registry interface and an in-process implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use aviary_core::ServerId;

use crate::error::{RouterError, RouterResult};
use crate::server::{ServerDescriptor, ServerStatus};

/// Directory of known capability servers.
///
/// Owned by the hosting environment; the matcher only reads from it. Every
/// lifecycle transition on the registry side must be forwarded to
/// [`CapabilityMatcher::handle_registry_event`](crate::CapabilityMatcher::handle_registry_event)
/// so cached rankings are dropped.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// All servers whose declared capability set contains `capability`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Registry`] when the registry cannot be
    /// queried; an empty candidate list is `Ok`, not an error.
    async fn servers_by_capability(&self, capability: &str) -> RouterResult<Vec<ServerDescriptor>>;
}

/// A registry lifecycle event.
///
/// Each variant triggers full cache invalidation in the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A server's transport came up.
    Connected(ServerId),
    /// A server's transport went down.
    Disconnected(ServerId),
    /// A server was added to the registry.
    Registered(ServerId),
    /// A server was removed from the registry.
    Unregistered(ServerId),
}

impl RegistryEvent {
    /// The server the event concerns.
    #[must_use]
    pub fn server_id(&self) -> &ServerId {
        match self {
            RegistryEvent::Connected(id)
            | RegistryEvent::Disconnected(id)
            | RegistryEvent::Registered(id)
            | RegistryEvent::Unregistered(id) => id,
        }
    }
}

/// In-process registry for development and tests.
///
/// Mutators return the [`RegistryEvent`] the host should feed back into the
/// matcher, keeping the invalidation contract explicit.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    servers: RwLock<HashMap<ServerId, ServerDescriptor>>,
}

impl StaticRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a server.
    pub fn register(&self, server: ServerDescriptor) -> RegistryEvent {
        let id = server.id.clone();
        if let Ok(mut servers) = self.servers.write() {
            servers.insert(id.clone(), server);
        }
        RegistryEvent::Registered(id)
    }

    /// Update a server's lifecycle status.
    ///
    /// Returns the matching lifecycle event, or `None` for an unknown server
    /// or a status with no dedicated event (`Registered` is reported through
    /// [`StaticRegistry::register`]).
    pub fn set_status(&self, id: &ServerId, status: ServerStatus) -> Option<RegistryEvent> {
        let mut servers = self.servers.write().ok()?;
        let server = servers.get_mut(id)?;
        server.status = status;
        match status {
            ServerStatus::Connected | ServerStatus::Running => {
                Some(RegistryEvent::Connected(id.clone()))
            },
            ServerStatus::Disconnected => Some(RegistryEvent::Disconnected(id.clone())),
            ServerStatus::Unregistered => Some(RegistryEvent::Unregistered(id.clone())),
            ServerStatus::Registered => None,
        }
    }

    /// Remove a server entirely.
    pub fn unregister(&self, id: &ServerId) -> Option<RegistryEvent> {
        let mut servers = self.servers.write().ok()?;
        servers
            .remove(id)
            .map(|_| RegistryEvent::Unregistered(id.clone()))
    }

    /// Number of registered servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn servers_by_capability(&self, capability: &str) -> RouterResult<Vec<ServerDescriptor>> {
        let servers = self
            .servers
            .read()
            .map_err(|e| RouterError::Internal(e.to_string()))?;
        Ok(servers
            .values()
            .filter(|s| s.declares(capability))
            .cloned()
            .collect())
    }
}
