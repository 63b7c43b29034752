//! Aviary Core - Shared types for the Aviary app platform.
//!
//! This crate provides:
//! - Identifier newtypes for apps, execution contexts, and servers
//! - The app configuration contract declared by the hosting shell
//! - Permission scopes gating the platform API surface
//! - A tolerant component-wise version type used by capability routing
//!
//! Everything here is plain data: no I/O, no async, no platform state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod app;
mod id;
mod scope;
mod version;

pub use app::{AppConfig, ValidationError};
pub use id::{AppId, ContextId, ServerId};
pub use scope::{ParseScopeError, Scope};
pub use version::{ParseVersionError, Version};
