//! Trusted in-process execution.
//!
//! Development-only alternative to WASM isolation: app code is a native
//! trait object registered against its entrypoint path. No memory isolation
//! applies, but the permission checks on the API handle are identical to
//! the sandboxed path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use aviary_api::PlatformApi;
use aviary_core::ContextId;

/// Native app code runnable on the trusted path.
#[async_trait]
pub trait AppEntrypoint: Send + Sync {
    /// Run the app to completion.
    ///
    /// # Errors
    ///
    /// Returns the app's own error message; the executor wraps it as an
    /// execution failure.
    async fn run(&self, api: Arc<PlatformApi>) -> Result<Value, String>;
}

/// Registry mapping entrypoint paths to native app code.
#[derive(Default)]
pub struct TrustedEntrypoints {
    entries: RwLock<HashMap<PathBuf, Arc<dyn AppEntrypoint>>>,
}

impl TrustedEntrypoints {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the code behind an entrypoint path.
    pub fn register(&self, entrypoint: impl Into<PathBuf>, code: Arc<dyn AppEntrypoint>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entrypoint.into(), code);
        }
    }

    /// Look up the code behind an entrypoint path.
    #[must_use]
    pub fn get(&self, entrypoint: &Path) -> Option<Arc<dyn AppEntrypoint>> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(entrypoint).cloned())
    }
}

impl std::fmt::Debug for TrustedEntrypoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("TrustedEntrypoints")
            .field("count", &count)
            .finish_non_exhaustive()
    }
}

/// Per-context ambient API bindings for trusted code.
///
/// Keyed by context id, never by a single global slot, so concurrent
/// trusted contexts see only their own binding.
static AMBIENT: LazyLock<RwLock<HashMap<ContextId, Arc<PlatformApi>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// The ambient API binding for a context, if it is mid-execution.
#[must_use]
pub fn ambient_api(context_id: ContextId) -> Option<Arc<PlatformApi>> {
    AMBIENT
        .read()
        .ok()
        .and_then(|table| table.get(&context_id).cloned())
}

/// Removes a context's ambient binding on every exit path, panics included.
pub(crate) struct AmbientGuard {
    context_id: ContextId,
}

impl AmbientGuard {
    pub(crate) fn install(context_id: ContextId, api: Arc<PlatformApi>) -> Self {
        if let Ok(mut table) = AMBIENT.write() {
            table.insert(context_id, api);
        }
        Self { context_id }
    }
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        if let Ok(mut table) = AMBIENT.write() {
            table.remove(&self.context_id);
        }
    }
}
