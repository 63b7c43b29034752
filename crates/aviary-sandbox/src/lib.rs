//! Aviary Sandbox - Isolated execution of untrusted app code.
//!
//! This crate provides:
//! - [`SandboxExecutor`]: creates per-app execution contexts and runs app
//!   code to completion inside them
//! - WASM isolation via Extism, one dedicated worker thread per context,
//!   with blake3 module verification and a hard execution timeout that
//!   terminates the isolate
//! - A trusted in-process path for development, with per-context ambient
//!   API bindings guarded against leaks on every exit path
//!
//! # Architecture
//!
//! Guest code reaches the host only through the single `aviary_api` host
//! function, which routes serialized requests through the context's
//! [`ApiDispatcher`](aviary_api::ApiDispatcher); the same permission checks
//! apply as on the native API facades. Each call gets a fresh plugin
//! instance, so one run leaves no state behind for the next.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod context;
mod error;
mod executor;
mod isolate;
mod trusted;

pub use config::{DEFAULT_EXECUTION_TIMEOUT, SandboxConfig};
pub use context::ExecutionContext;
pub use error::{SandboxError, SandboxResult};
pub use executor::SandboxExecutor;
pub use trusted::{AppEntrypoint, TrustedEntrypoints, ambient_api};
