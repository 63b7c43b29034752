//! App configuration contract.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::AppId;
use crate::scope::Scope;

/// Configuration declared by the hosting shell when launching an app.
///
/// `id`, `name` and `entrypoint` are required; `validate()` rejects configs
/// missing any of them before the runtime takes any action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Stable app identifier, unique among running apps.
    pub id: AppId,
    /// Human-readable app name.
    pub name: String,
    /// Path to the app's entrypoint module.
    pub entrypoint: PathBuf,
    /// Declared app version.
    #[serde(default)]
    pub version: Option<String>,
    /// Permission scopes the app requests.
    #[serde(default)]
    pub permissions: Vec<Scope>,
    /// Expected blake3 hash of the entrypoint module, hex-encoded.
    #[serde(default)]
    pub module_hash: Option<String>,
}

impl AppConfig {
    /// Create a config with the three required fields.
    #[must_use]
    pub fn new(id: impl Into<AppId>, name: impl Into<String>, entrypoint: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entrypoint: entrypoint.into(),
            version: None,
            permissions: Vec::new(),
            module_hash: None,
        }
    }

    /// Add requested permission scopes.
    #[must_use]
    pub fn with_permissions(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.permissions.extend(scopes);
        self
    }

    /// Set the expected module hash.
    #[must_use]
    pub fn with_module_hash(mut self, hash: impl Into<String>) -> Self {
        self.module_hash = Some(hash.into());
        self
    }

    /// Validate the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first missing field. Has no
    /// side effects; a config that fails validation never reaches the
    /// permission manager or the sandbox.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField { field: "id" });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" });
        }
        if self.entrypoint.as_os_str().is_empty() {
            return Err(ValidationError::MissingField { field: "entrypoint" });
        }
        Ok(())
    }
}

/// A malformed app config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required config field is empty or absent.
    #[error("app config is missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let config = AppConfig::new("notes", "Notes", "apps/notes.wasm");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_id_rejected() {
        let config = AppConfig::new("", "Notes", "apps/notes.wasm");
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingField { field: "id" })
        );
    }

    #[test]
    fn blank_name_rejected() {
        let config = AppConfig::new("notes", "   ", "apps/notes.wasm");
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingField { field: "name" })
        );
    }

    #[test]
    fn empty_entrypoint_rejected() {
        let config = AppConfig::new("notes", "Notes", "");
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingField { field: "entrypoint" })
        );
    }

    #[test]
    fn permissions_builder() {
        let config = AppConfig::new("notes", "Notes", "apps/notes.wasm")
            .with_permissions([Scope::Storage, Scope::Events]);
        assert_eq!(config.permissions, vec![Scope::Storage, Scope::Events]);
    }
}
