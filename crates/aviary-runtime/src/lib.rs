//! Aviary Runtime - App orchestration for the Aviary platform.
//!
//! This crate provides:
//! - [`AppRuntime`]: the orchestrator driving validate → permission-check →
//!   create context → execute → record, with lifecycle events on the bus
//! - [`PermissionManager`]: pure policy validation of requested scopes
//! - [`RuntimeConfig`]: TOML configuration with serde defaults
//! - Logging setup over `tracing-subscriber`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aviary_core::{AppConfig, Scope};
//! use aviary_router::StaticRegistry;
//! use aviary_runtime::{AppRuntime, RuntimeConfig};
//!
//! # async fn example() -> Result<(), aviary_runtime::RuntimeError> {
//! let config = RuntimeConfig::default();
//! let runtime = AppRuntime::new(&config, Arc::new(StaticRegistry::new()));
//!
//! let app = AppConfig::new("notes", "Notes", "apps/notes.wasm")
//!     .with_permissions([Scope::Storage, Scope::Events]);
//! let output = runtime.execute_app(app).await?;
//! println!("app returned: {output}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod error;
mod logging;
mod permissions;
mod runtime;

pub use config::{
    ConfigError, ConfigResult, PermissionsSection, PlatformSection, RouterSection, RuntimeConfig,
    SandboxSection,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LogConfig, LogFormat, init_logging};
pub use permissions::{PermissionError, PermissionManager, PermissionPolicy};
pub use runtime::AppRuntime;
