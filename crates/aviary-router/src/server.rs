//! Server descriptors as reported by the service registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use aviary_core::ServerId;

/// Whether a server ships with the platform or was connected externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    /// Bundled with the platform.
    Builtin,
    /// Connected by the user or hosting shell.
    External,
}

/// Lifecycle status of a server.
///
/// Only `Running` earns the status score bonus, but a server in any status
/// remains a (lower-scored) candidate as long as it declares the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// Known to the registry but never connected.
    Registered,
    /// Transport established, not yet serving.
    Connected,
    /// Actively serving requests.
    Running,
    /// Was connected, currently unreachable.
    Disconnected,
    /// Removed from the registry.
    Unregistered,
}

/// A capability server, owned by the external service registry.
///
/// The matcher reads these by value and never writes them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Registry-wide unique identifier.
    pub id: ServerId,
    /// Human-readable name.
    pub name: String,
    /// Builtin or external.
    pub kind: ServerKind,
    /// Current lifecycle status.
    pub status: ServerStatus,
    /// Capabilities this server declares.
    pub capabilities: Vec<String>,
    /// Free-form registry metadata.
    #[serde(default)]
    pub metadata: Value,
    /// Reported version string, if any.
    #[serde(default)]
    pub version: Option<String>,
}

impl ServerDescriptor {
    /// Convenience constructor for a running builtin server.
    #[must_use]
    pub fn builtin(
        id: impl Into<ServerId>,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ServerKind::Builtin,
            status: ServerStatus::Running,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            metadata: Value::Null,
            version: None,
        }
    }

    /// Convenience constructor for a running external server.
    #[must_use]
    pub fn external(
        id: impl Into<ServerId>,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ServerKind::External,
            status: ServerStatus::Running,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            metadata: Value::Null,
            version: None,
        }
    }

    /// Set the lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: ServerStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the reported version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether this server declares a capability.
    #[must_use]
    pub fn declares(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// A server together with its computed score, in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredServer {
    /// The candidate server.
    pub server: ServerDescriptor,
    /// Final clamped score.
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let server = ServerDescriptor::external("brave", "Brave Search", ["web-search"])
            .with_status(ServerStatus::Connected)
            .with_version("2.1");
        assert_eq!(server.kind, ServerKind::External);
        assert_eq!(server.status, ServerStatus::Connected);
        assert_eq!(server.version.as_deref(), Some("2.1"));
        assert!(server.declares("web-search"));
        assert!(!server.declares("text-generate"));
    }

    #[test]
    fn status_serde_snake_case() {
        let json = serde_json::to_string(&ServerStatus::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");
    }
}
