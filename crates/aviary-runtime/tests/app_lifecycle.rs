//! End-to-end app lifecycle tests on the trusted execution path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use aviary_api::PlatformApi;
use aviary_core::{AppConfig, AppId, Scope};
use aviary_events::EventReceiver;
use aviary_router::StaticRegistry;
use aviary_runtime::{AppRuntime, RuntimeConfig, RuntimeError};
use aviary_sandbox::{AppEntrypoint, SandboxError};

struct Quick;

#[async_trait]
impl AppEntrypoint for Quick {
    async fn run(&self, api: Arc<PlatformApi>) -> Result<Value, String> {
        Ok(serde_json::json!({ "app": api.current_app().as_str() }))
    }
}

struct Slow;

#[async_trait]
impl AppEntrypoint for Slow {
    async fn run(&self, _api: Arc<PlatformApi>) -> Result<Value, String> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(Value::Null)
    }
}

/// Emits one event through the API, reporting any denial as its error.
struct Emitter;

#[async_trait]
impl AppEntrypoint for Emitter {
    async fn run(&self, api: Arc<PlatformApi>) -> Result<Value, String> {
        let receivers = api
            .events()
            .emit("started", serde_json::json!({ "ready": true }))
            .map_err(|e| e.to_string())?;
        Ok(serde_json::json!({ "receivers": receivers }))
    }
}

fn trusted_runtime(timeout_secs: u64) -> AppRuntime {
    let mut config = RuntimeConfig::default();
    config.sandbox.sandboxed = false;
    config.sandbox.execution_timeout_secs = timeout_secs;
    AppRuntime::new(&config, Arc::new(StaticRegistry::new()))
}

fn app(id: &str, entrypoint: &str) -> AppConfig {
    AppConfig::new(id, format!("{id} app"), entrypoint)
        .with_permissions([Scope::Storage, Scope::Events])
}

fn register(runtime: &AppRuntime, entrypoint: &str, code: Arc<dyn AppEntrypoint>) {
    runtime
        .executor()
        .trusted_entrypoints()
        .register(entrypoint, code);
}

fn event_types(rx: &mut EventReceiver) -> Vec<String> {
    let mut types = Vec::new();
    while let Some(event) = rx.try_recv() {
        types.push(event.event_type().to_string());
    }
    types
}

#[tokio::test]
async fn successful_launch_records_app_and_publishes_started() -> anyhow::Result<()> {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/notes.entry", Arc::new(Quick));
    let mut rx = runtime.bus().subscribe();

    let output = runtime.execute_app(app("notes", "apps/notes.entry")).await?;
    assert_eq!(output, serde_json::json!({ "app": "notes" }));

    assert!(runtime.is_running(&AppId::new("notes")).await);
    let apps = runtime.running_apps().await;
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].name, "notes app");

    assert_eq!(event_types(&mut rx), vec!["app_started"]);
    Ok(())
}

#[tokio::test]
async fn app_is_listed_by_the_time_started_is_published() {
    let runtime = Arc::new(trusted_runtime(30));
    register(&runtime, "apps/notes.entry", Arc::new(Quick));
    let mut rx = runtime.bus().subscribe_topic("platform.app.started");

    let observer = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move {
            // A subscriber reacting to app_started must already see the app.
            rx.recv().await.expect("app_started should be published");
            runtime.is_running(&AppId::new("notes")).await
        })
    };

    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();
    assert!(observer.await.unwrap());
}

#[tokio::test]
async fn configured_platform_identity_reaches_app_code() {
    let config = RuntimeConfig::from_toml_str(
        r#"
        [platform]
        name = "aviary-dev"
        version = "0.0.0-dev"

        [sandbox]
        sandboxed = false
        "#,
    )
    .unwrap();
    let runtime = AppRuntime::new(&config, Arc::new(StaticRegistry::new()));

    struct Introspect;

    #[async_trait]
    impl AppEntrypoint for Introspect {
        async fn run(&self, api: Arc<PlatformApi>) -> Result<Value, String> {
            let info = api.platform_info();
            Ok(serde_json::json!({ "name": info.name, "version": info.version }))
        }
    }

    register(&runtime, "apps/who.entry", Arc::new(Introspect));
    let output = runtime.execute_app(app("who", "apps/who.entry")).await.unwrap();
    assert_eq!(
        output,
        serde_json::json!({ "name": "aviary-dev", "version": "0.0.0-dev" })
    );
}

#[tokio::test]
async fn invalid_config_fails_validation_with_no_side_effects() {
    let runtime = trusted_runtime(30);
    let mut rx = runtime.bus().subscribe();

    let bad = AppConfig::new("", "Nameless", "apps/x.entry");
    let err = runtime.execute_app(bad).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Validation(_)));

    assert!(runtime.running_apps().await.is_empty());
    // Failure is announced, but nothing started.
    assert_eq!(event_types(&mut rx), vec!["app_error"]);
}

#[tokio::test]
async fn undeclared_scope_rejected_by_policy() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/root.entry", Arc::new(Quick));

    let greedy =
        AppConfig::new("root", "Root", "apps/root.entry").with_permissions([Scope::System]);
    let err = runtime.execute_app(greedy).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Permission(_)));
    assert!(!runtime.is_running(&AppId::new("root")).await);
}

#[tokio::test]
async fn app_error_event_precedes_error_return() {
    let runtime = trusted_runtime(30);
    let mut rx = runtime.bus().subscribe();

    let err = runtime
        .execute_app(app("ghost", "apps/unregistered.entry"))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Sandbox(_)));

    // The event is already on the bus by the time the caller sees the error.
    let event = rx.try_recv().expect("app_error should be published");
    assert_eq!(event.event_type(), "app_error");
}

#[tokio::test]
async fn double_launch_rejected() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/notes.entry", Arc::new(Quick));

    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();
    let err = runtime
        .execute_app(app("notes", "apps/notes.entry"))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::AlreadyRunning { .. }));

    // Still exactly one running instance.
    assert_eq!(runtime.running_apps().await.len(), 1);
}

#[tokio::test]
async fn stop_destroys_context_and_publishes_stopped() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/notes.entry", Arc::new(Quick));

    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();
    let id = AppId::new("notes");
    let context_id = runtime.context_id(&id).await.unwrap();

    let mut rx = runtime.bus().subscribe();
    runtime.stop_app(&id).await.unwrap();

    assert!(!runtime.is_running(&id).await);
    assert!(!runtime.executor().has_context(context_id));
    assert_eq!(event_types(&mut rx), vec!["app_stopped"]);

    // Restart works once the slot is free.
    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();
}

#[tokio::test]
async fn stopping_unknown_app_changes_nothing() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/notes.entry", Arc::new(Quick));
    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();

    let mut rx = runtime.bus().subscribe();
    let err = runtime.stop_app(&AppId::new("phantom")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::AppNotFound { .. }));

    assert!(runtime.is_running(&AppId::new("notes")).await);
    assert!(rx.try_recv().is_none());
}

#[tokio::test]
async fn timeout_terminates_and_reports() {
    let runtime = trusted_runtime(1);
    register(&runtime, "apps/slow.entry", Arc::new(Slow));

    let err = runtime.execute_app(app("slow", "apps/slow.entry")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Sandbox(SandboxError::Timeout)));
    assert!(!runtime.is_running(&AppId::new("slow")).await);
}

#[tokio::test]
async fn uptime_is_monotonic() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/notes.entry", Arc::new(Quick));
    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();

    let first = runtime.running_apps().await[0].uptime;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = runtime.running_apps().await[0].uptime;
    assert!(second >= first);
}

#[tokio::test]
async fn app_events_are_namespaced_and_visible() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/emitter.entry", Arc::new(Emitter));
    let mut rx = runtime.bus().subscribe_topic("app.emitter.*");

    runtime.execute_app(app("emitter", "apps/emitter.entry")).await.unwrap();

    let event = rx.try_recv().expect("app event should reach topic subscribers");
    assert_eq!(event.topic(), "app.emitter.started");
}

#[tokio::test]
async fn scope_checks_apply_inside_app_code() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/emitter.entry", Arc::new(Emitter));

    // Same entrypoint, but without the events scope.
    let muted = AppConfig::new("muted", "Muted", "apps/emitter.entry")
        .with_permissions([Scope::Storage]);
    let err = runtime.execute_app(muted).await.unwrap_err();
    match err {
        RuntimeError::Sandbox(SandboxError::ExecutionFailed { message, .. }) => {
            assert!(message.contains("permission denied"), "message: {message}");
        },
        other => panic!("expected ExecutionFailed, got: {other:?}"),
    }
}

#[tokio::test]
async fn apps_facade_lists_running_apps() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/notes.entry", Arc::new(Quick));
    runtime.execute_app(app("notes", "apps/notes.entry")).await.unwrap();

    // A second app observes the first through the apps facade.
    struct Lister;

    #[async_trait]
    impl AppEntrypoint for Lister {
        async fn run(&self, api: Arc<PlatformApi>) -> Result<Value, String> {
            let apps = api.apps().list().await.map_err(|e| e.to_string())?;
            Ok(serde_json::json!({ "count": apps.len() }))
        }
    }

    register(&runtime, "apps/lister.entry", Arc::new(Lister));
    let lister = AppConfig::new("lister", "Lister", "apps/lister.entry")
        .with_permissions([Scope::Apps]);
    let output = runtime.execute_app(lister).await.unwrap();
    assert_eq!(output, serde_json::json!({ "count": 1 }));
}

#[tokio::test]
async fn shutdown_stops_everything() {
    let runtime = trusted_runtime(30);
    register(&runtime, "apps/a.entry", Arc::new(Quick));
    register(&runtime, "apps/b.entry", Arc::new(Quick));
    runtime.execute_app(app("a", "apps/a.entry")).await.unwrap();
    runtime.execute_app(app("b", "apps/b.entry")).await.unwrap();

    runtime.shutdown().await;
    assert!(runtime.running_apps().await.is_empty());
}
