//! Runtime configuration.
//!
//! TOML-loaded with serde defaults, so an empty file is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use aviary_core::Scope;
use aviary_sandbox::SandboxConfig;

use crate::permissions::PermissionPolicy;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but holds a rejected value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Platform identity.
    pub platform: PlatformSection,
    /// Sandbox executor settings.
    pub sandbox: SandboxSection,
    /// Permission policy.
    pub permissions: PermissionsSection,
    /// Capability router settings.
    pub router: RouterSection,
}

/// `[platform]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformSection {
    /// Platform name.
    pub name: String,
    /// Platform version.
    pub version: String,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            name: "aviary".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// `[sandbox]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxSection {
    /// Run app code in WASM isolates.
    pub sandboxed: bool,
    /// Maximum isolate heap in bytes.
    pub max_memory_bytes: Option<u64>,
    /// Per-call execution limit in seconds.
    pub execution_timeout_secs: u64,
    /// Reject modules without a declared hash.
    pub require_module_hash: bool,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            sandboxed: true,
            max_memory_bytes: Some(64 * 1024 * 1024),
            execution_timeout_secs: 30,
            require_module_hash: false,
        }
    }
}

/// `[permissions]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionsSection {
    /// Scopes the platform grants to apps.
    pub granted: Vec<Scope>,
}

impl Default for PermissionsSection {
    fn default() -> Self {
        Self {
            granted: vec![
                Scope::Storage,
                Scope::Apps,
                Scope::Capabilities,
                Scope::Events,
                Scope::Network,
                Scope::FileSystem,
            ],
        }
    }
}

/// `[router]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterSection {
    /// Match cache TTL in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self { cache_ttl_secs: 60 }
    }
}

impl RuntimeConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the file cannot be read, plus everything
    /// [`from_toml_str`](Self::from_toml_str) raises.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML config text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for rejected values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot operate with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for a zero execution timeout or cache TTL.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sandbox.execution_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.execution_timeout_secs must be positive".to_string(),
            ));
        }
        if self.router.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "router.cache_ttl_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The sandbox section as a [`SandboxConfig`].
    #[must_use]
    pub fn sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            sandboxed: self.sandbox.sandboxed,
            max_memory_bytes: self.sandbox.max_memory_bytes,
            execution_timeout: Duration::from_secs(self.sandbox.execution_timeout_secs),
            require_module_hash: self.sandbox.require_module_hash,
        }
    }

    /// The permissions section as a [`PermissionPolicy`].
    #[must_use]
    pub fn policy(&self) -> PermissionPolicy {
        PermissionPolicy::granting(self.permissions.granted.iter().copied())
    }

    /// The router cache TTL.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.router.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config.platform.name, "aviary");
        assert!(config.sandbox.sandboxed);
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert!(config.policy().grants(Scope::Storage));
        assert!(!config.policy().grants(Scope::System));
    }

    #[test]
    fn sections_parse_from_toml() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [platform]
            name = "aviary-dev"

            [sandbox]
            sandboxed = false
            execution_timeout_secs = 5

            [permissions]
            granted = ["storage", "events"]

            [router]
            cache_ttl_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.platform.name, "aviary-dev");
        assert!(!config.sandbox_config().sandboxed);
        assert_eq!(
            config.sandbox_config().execution_timeout,
            Duration::from_secs(5)
        );
        assert!(config.policy().grants(Scope::Events));
        assert!(!config.policy().grants(Scope::Network));
        assert_eq!(config.cache_ttl(), Duration::from_secs(10));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = RuntimeConfig::from_toml_str("[sandbox]\nexecution_timeout_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = RuntimeConfig::from_toml_str("[sandbox]\nmax_heap = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aviary.toml");
        std::fs::write(&path, "[router]\ncache_ttl_secs = 15").unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(15));

        let missing = RuntimeConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
