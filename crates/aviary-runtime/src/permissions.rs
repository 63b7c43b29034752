//! Permission policy and validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use aviary_core::Scope;

/// A scope was requested that the policy does not grant.
#[derive(Debug, thiserror::Error)]
#[error("scope '{scope}' is not granted by the platform policy")]
pub struct PermissionError {
    /// The ungranted scope.
    pub scope: Scope,
}

/// The set of scopes the platform is willing to grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionPolicy {
    granted: HashSet<Scope>,
}

impl PermissionPolicy {
    /// Policy granting exactly the given scopes.
    #[must_use]
    pub fn granting(scopes: impl IntoIterator<Item = Scope>) -> Self {
        Self {
            granted: scopes.into_iter().collect(),
        }
    }

    /// Whether a scope is granted.
    #[must_use]
    pub fn grants(&self, scope: Scope) -> bool {
        self.granted.contains(&scope)
    }
}

impl Default for PermissionPolicy {
    /// The standard app scopes; `System` is withheld.
    fn default() -> Self {
        Self::granting([
            Scope::Storage,
            Scope::Apps,
            Scope::Capabilities,
            Scope::Events,
            Scope::Network,
            Scope::FileSystem,
        ])
    }
}

/// Validates requested scopes against the policy. Pure, no side effects.
#[derive(Debug, Clone, Default)]
pub struct PermissionManager {
    policy: PermissionPolicy,
}

impl PermissionManager {
    /// Create a manager over a policy.
    #[must_use]
    pub fn new(policy: PermissionPolicy) -> Self {
        Self { policy }
    }

    /// Check every requested scope against the policy.
    ///
    /// # Errors
    ///
    /// [`PermissionError`] naming the first scope the policy withholds.
    pub fn validate(&self, requested: &[Scope]) -> Result<(), PermissionError> {
        for scope in requested {
            if !self.policy.grants(*scope) {
                return Err(PermissionError { scope: *scope });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_withholds_system() {
        let manager = PermissionManager::default();
        assert!(manager.validate(&[Scope::Storage, Scope::Events]).is_ok());

        let err = manager.validate(&[Scope::Storage, Scope::System]).unwrap_err();
        assert_eq!(err.scope, Scope::System);
    }

    #[test]
    fn empty_request_always_valid() {
        let manager = PermissionManager::new(PermissionPolicy::granting([]));
        assert!(manager.validate(&[]).is_ok());
        assert!(manager.validate(&[Scope::Storage]).is_err());
    }
}
