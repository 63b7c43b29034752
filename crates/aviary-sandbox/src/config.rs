//! Sandbox configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call execution limit.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Executor-wide settings, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Run app code in WASM isolates. `false` switches to the trusted
    /// in-process path, for development only.
    pub sandboxed: bool,
    /// Maximum isolate heap in bytes; `None` leaves the engine default.
    pub max_memory_bytes: Option<u64>,
    /// Per-call execution limit.
    #[serde(with = "humantime_secs")]
    pub execution_timeout: Duration,
    /// Reject modules without a declared hash.
    pub require_module_hash: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            sandboxed: true,
            max_memory_bytes: Some(64 * 1024 * 1024),
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            require_module_hash: false,
        }
    }
}

impl SandboxConfig {
    /// Switch to the trusted in-process path.
    #[must_use]
    pub fn trusted() -> Self {
        Self {
            sandboxed: false,
            ..Self::default()
        }
    }

    /// Set the per-call execution limit.
    #[must_use]
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Set the maximum isolate heap.
    #[must_use]
    pub fn with_max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Require a module hash on every execution.
    #[must_use]
    pub fn with_require_module_hash(mut self, require: bool) -> Self {
        self.require_module_hash = require;
        self
    }
}

/// Serialize the timeout as whole seconds, matching the config file shape.
mod humantime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sandboxed() {
        let config = SandboxConfig::default();
        assert!(config.sandboxed);
        assert_eq!(config.execution_timeout, Duration::from_secs(30));
        assert!(!config.require_module_hash);
    }

    #[test]
    fn trusted_preset_flips_sandboxing_only() {
        let config = SandboxConfig::trusted();
        assert!(!config.sandboxed);
        assert_eq!(config.execution_timeout, DEFAULT_EXECUTION_TIMEOUT);
    }

    #[test]
    fn timeout_round_trips_as_seconds() {
        let config = SandboxConfig::default().with_execution_timeout(Duration::from_secs(5));
        let json = serde_json::to_string(&config).unwrap();
        let back: SandboxConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.execution_timeout, Duration::from_secs(5));
    }
}
