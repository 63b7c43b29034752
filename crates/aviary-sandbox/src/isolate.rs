//! WASM isolate worker.
//!
//! Each sandboxed context owns one dedicated OS thread. The thread receives
//! execute instructions over a channel, builds an Extism plugin per call,
//! and replies on a oneshot. The only way back into the host is the single
//! `aviary_api` host function, which routes serialized requests through the
//! context's [`ApiDispatcher`] with the same permission checks as the native
//! facades.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use extism::{CancelHandle, CurrentPlugin, Error, Manifest, PTR, PluginBuilder, UserData, Val, Wasm};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use aviary_api::ApiDispatcher;
use aviary_core::{AppId, Scope};

use crate::config::SandboxConfig;
use crate::error::{SandboxError, SandboxResult};

/// WASM linear memory page size.
const WASM_PAGE_BYTES: u64 = 64 * 1024;

/// Name of the guest export invoked per execution.
const RUN_EXPORT: &str = "run";

/// One instruction to the worker thread.
pub(crate) enum Instruction {
    /// Load a module and call its `run` export once.
    Execute {
        /// Path to the `.wasm` module.
        entrypoint: PathBuf,
        /// Expected blake3 hash of the module bytes, when declared.
        expected_hash: Option<String>,
        /// Reply channel; exactly one reply per instruction.
        reply: oneshot::Sender<SandboxResult<Value>>,
    },
    /// Stop the worker.
    Shutdown,
}

/// Host-side handle to one isolate worker.
pub(crate) struct IsolateHandle {
    tx: mpsc::Sender<Instruction>,
    /// Cancel handle of the in-flight call, set by the worker for the
    /// duration of each `run` invocation.
    cancel: Arc<Mutex<Option<CancelHandle>>>,
}

impl IsolateHandle {
    pub(crate) fn send(&self, instruction: Instruction) -> SandboxResult<()> {
        self.tx
            .send(instruction)
            .map_err(|_| SandboxError::Isolate("worker thread is gone".to_string()))
    }

    /// Terminate any in-flight guest call.
    pub(crate) fn terminate(&self) {
        let handle = self.cancel.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.cancel() {
                warn!(error = %e, "Failed to cancel in-flight isolate call");
            }
        }
    }

    /// Ask the worker to exit once it finishes the current instruction.
    pub(crate) fn shutdown(&self) {
        self.terminate();
        let _ = self.tx.send(Instruction::Shutdown);
    }
}

/// State shared with the `aviary_api` host function.
struct HostState {
    dispatcher: Arc<ApiDispatcher>,
    runtime_handle: tokio::runtime::Handle,
}

/// Spawn the worker thread for one context.
pub(crate) fn spawn_isolate(
    app_id: AppId,
    scopes: Vec<Scope>,
    dispatcher: Arc<ApiDispatcher>,
    config: SandboxConfig,
    runtime_handle: tokio::runtime::Handle,
) -> IsolateHandle {
    let (tx, rx) = mpsc::channel::<Instruction>();
    let cancel: Arc<Mutex<Option<CancelHandle>>> = Arc::new(Mutex::new(None));
    let worker_cancel = Arc::clone(&cancel);

    let spawned = std::thread::Builder::new()
        .name(format!("aviary-isolate-{app_id}"))
        .spawn(move || {
            worker_loop(&app_id, &scopes, &dispatcher, &config, &runtime_handle, &worker_cancel, &rx);
        });

    let tx = match spawned {
        Ok(_join) => tx,
        Err(e) => {
            // The worker never started; surface the failure on first send.
            warn!(error = %e, "Failed to spawn isolate worker thread");
            broken_sender()
        },
    };
    IsolateHandle { tx, cancel }
}

/// A sender whose receiver is already gone, so every send fails cleanly.
fn broken_sender() -> mpsc::Sender<Instruction> {
    let (tx, _) = mpsc::channel();
    tx
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    app_id: &AppId,
    scopes: &[Scope],
    dispatcher: &Arc<ApiDispatcher>,
    config: &SandboxConfig,
    runtime_handle: &tokio::runtime::Handle,
    cancel: &Arc<Mutex<Option<CancelHandle>>>,
    rx: &mpsc::Receiver<Instruction>,
) {
    debug!(app = %app_id, "Isolate worker started");
    while let Ok(instruction) = rx.recv() {
        match instruction {
            Instruction::Execute {
                entrypoint,
                expected_hash,
                reply,
            } => {
                let result = run_module(
                    app_id,
                    scopes,
                    &entrypoint,
                    expected_hash.as_deref(),
                    dispatcher,
                    config,
                    runtime_handle,
                    cancel,
                );
                // Receiver may have timed out and moved on.
                let _ = reply.send(result);
            },
            Instruction::Shutdown => break,
        }
    }
    debug!(app = %app_id, "Isolate worker stopped");
}

/// Load, verify, and run one module invocation.
#[allow(clippy::too_many_arguments)]
fn run_module(
    app_id: &AppId,
    scopes: &[Scope],
    entrypoint: &Path,
    expected_hash: Option<&str>,
    dispatcher: &Arc<ApiDispatcher>,
    config: &SandboxConfig,
    runtime_handle: &tokio::runtime::Handle,
    cancel: &Arc<Mutex<Option<CancelHandle>>>,
) -> SandboxResult<Value> {
    let wasm_bytes = std::fs::read(entrypoint).map_err(|e| SandboxError::ModuleLoad {
        path: entrypoint.to_path_buf(),
        message: e.to_string(),
    })?;

    verify_module_hash(
        &wasm_bytes,
        expected_hash,
        entrypoint,
        config.require_module_hash,
    )?;

    let mut manifest =
        Manifest::new([Wasm::data(wasm_bytes)]).with_timeout(config.execution_timeout);
    if let Some(bytes) = config.max_memory_bytes {
        manifest = manifest.with_memory_max(memory_pages(bytes));
    }

    let host_state = HostState {
        dispatcher: Arc::clone(dispatcher),
        runtime_handle: runtime_handle.clone(),
    };
    let mut plugin = PluginBuilder::new(manifest)
        .with_wasi(true)
        .with_function("aviary_api", [PTR], [PTR], UserData::new(host_state), aviary_api_impl)
        .build()
        .map_err(|e| SandboxError::Isolate(format!("failed to build isolate: {e}")))?;

    let launch = serde_json::json!({
        "app_id": app_id,
        "scopes": scopes,
    })
    .to_string();

    if let Ok(mut slot) = cancel.lock() {
        *slot = Some(plugin.cancel_handle());
    }
    debug!(app = %app_id, entrypoint = %entrypoint.display(), "Calling guest run export");
    let result = plugin.call::<&str, String>(RUN_EXPORT, &launch);
    if let Ok(mut slot) = cancel.lock() {
        *slot = None;
    }

    let output = result.map_err(|e| SandboxError::ExecutionFailed {
        message: e.to_string(),
        stack: None,
    })?;

    serde_json::from_str(&output).map_err(|e| SandboxError::ExecutionFailed {
        message: format!("guest returned invalid JSON: {e}"),
        stack: None,
    })
}

/// Verify module bytes against an optional expected blake3 hash.
pub(crate) fn verify_module_hash(
    wasm_bytes: &[u8],
    expected: Option<&str>,
    path: &Path,
    require_hash: bool,
) -> SandboxResult<()> {
    match expected {
        Some(expected_hex) => {
            let actual_hex = blake3::hash(wasm_bytes).to_hex().to_string();
            if actual_hex != expected_hex {
                return Err(SandboxError::HashMismatch {
                    expected: expected_hex.to_string(),
                    actual: actual_hex,
                });
            }
            debug!(path = %path.display(), "Module hash verified");
            Ok(())
        },
        None if require_hash => Err(SandboxError::ModuleLoad {
            path: path.to_path_buf(),
            message: "module hash required but not declared".to_string(),
        }),
        None => {
            warn!(path = %path.display(), "Module hash not declared, integrity not verified");
            Ok(())
        },
    }
}

/// Byte limit to WASM pages, saturating.
fn memory_pages(bytes: u64) -> u32 {
    u32::try_from(bytes / WASM_PAGE_BYTES).unwrap_or(u32::MAX)
}

#[allow(clippy::needless_pass_by_value)] // Signature required by Extism callback API
fn aviary_api_impl(
    plugin: &mut CurrentPlugin,
    inputs: &[Val],
    outputs: &mut [Val],
    user_data: UserData<HostState>,
) -> Result<(), Error> {
    let request: String = plugin.memory_get_val(&inputs[0])?;

    let ud = user_data.get()?;
    let state = ud
        .lock()
        .map_err(|e| Error::msg(format!("host state lock poisoned: {e}")))?;
    let dispatcher = Arc::clone(&state.dispatcher);
    let handle = state.runtime_handle.clone();
    drop(state);

    let reply = handle.block_on(dispatcher.dispatch_json(&request));

    let mem = plugin.memory_new(&reply)?;
    outputs[0] = plugin.memory_to_val(mem);
    Ok(())
}
