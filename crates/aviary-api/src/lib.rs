//! Aviary API - The platform surface exposed to app code.
//!
//! This crate provides:
//! - [`PlatformApi`]: a per-context handle binding one app id and its
//!   granted permission scopes
//! - Facades for events, capability queries, and app management, each
//!   checking the context's scope set before any side effect
//! - [`ApiDispatcher`]: serialized `{method, params}` dispatch for code
//!   running across the isolate boundary
//! - An app-scoped structured logger and small utilities (unique ids,
//!   delays, debouncing)
//!
//! # Architecture
//!
//! One `PlatformApi` exists per execution context and nowhere else; the app
//! identity travels on the handle rather than through global state. The
//! [`AppsHost`] trait is declared here and implemented by the runtime, which
//! keeps the dependency direction acyclic: runtime depends on api, never the
//! reverse.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod api;
mod apps;
mod capabilities;
mod dispatch;
mod error;
mod events;
mod logger;
pub mod util;

pub use api::{ExecutionMode, PlatformApi, PlatformInfo};
pub use apps::{AppSummary, AppsApi, AppsHost};
pub use capabilities::CapabilitiesApi;
pub use dispatch::{ApiDispatcher, ApiRequest};
pub use error::{ApiError, ApiResult};
pub use events::EventsApi;
pub use logger::AppLogger;
pub use util::Debouncer;
