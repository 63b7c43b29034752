//! Permission scopes gating the platform API surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A permission scope an app may declare in its config.
///
/// Scopes are a closed set: every privileged call of the API surface is
/// gated on exactly one of them. The permission manager validates the
/// declared set against policy before any context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Per-app key/value storage.
    Storage,
    /// Cross-app listing and messaging.
    Apps,
    /// Capability routing: listing servers and availability checks.
    Capabilities,
    /// Publishing and subscribing on the platform event bus.
    Events,
    /// Outbound network access.
    Network,
    /// Filesystem access within the app's workspace.
    FileSystem,
    /// Host system introspection. Never granted by the default policy.
    System,
}

impl Scope {
    /// All scopes, in declaration order.
    pub const ALL: [Scope; 7] = [
        Scope::Storage,
        Scope::Apps,
        Scope::Capabilities,
        Scope::Events,
        Scope::Network,
        Scope::FileSystem,
        Scope::System,
    ];

    /// The canonical string form used in configs and wire payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Storage => "storage",
            Scope::Apps => "apps",
            Scope::Capabilities => "capabilities",
            Scope::Events => "events",
            Scope::Network => "network",
            Scope::FileSystem => "file_system",
            Scope::System => "system",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a scope string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission scope: {0}")]
pub struct ParseScopeError(pub String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .iter()
            .find(|scope| scope.as_str() == s)
            .copied()
            .ok_or_else(|| ParseScopeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_scopes() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
    }

    #[test]
    fn unknown_scope_rejected() {
        let err = "telepathy".parse::<Scope>().unwrap_err();
        assert_eq!(err.0, "telepathy");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Scope::FileSystem).unwrap();
        assert_eq!(json, "\"file_system\"");
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Scope::FileSystem);
    }
}
