//! Platform event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use aviary_core::{AppId, ServerId};

/// Metadata attached to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Component that published the event.
    pub source: String,
}

impl EventMetadata {
    /// Create metadata stamped with the current time.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }
}

/// An event on the platform bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// An app started running.
    AppStarted {
        /// Event metadata.
        metadata: EventMetadata,
        /// The started app.
        app_id: AppId,
        /// Human-readable app name.
        name: String,
    },
    /// An app was stopped.
    AppStopped {
        /// Event metadata.
        metadata: EventMetadata,
        /// The stopped app.
        app_id: AppId,
    },
    /// An app failed somewhere between validation and execution.
    ///
    /// Published before the error is re-raised to the caller.
    AppError {
        /// Event metadata.
        metadata: EventMetadata,
        /// The failing app.
        app_id: AppId,
        /// Rendered error message.
        error: String,
    },
    /// The capability matcher ranked candidates and picked a winner.
    CapabilityMatched {
        /// Event metadata.
        metadata: EventMetadata,
        /// Capability that was requested.
        capability: String,
        /// The top-ranked server.
        server_id: ServerId,
        /// The winning score, in `[0, 1]`.
        score: f64,
    },
    /// A capability match could not be computed.
    CapabilityMatchFailed {
        /// Event metadata.
        metadata: EventMetadata,
        /// Capability that was requested.
        capability: String,
        /// Why the match failed.
        reason: String,
    },
    /// An app-emitted event, namespaced by its topic.
    Custom {
        /// Event metadata.
        metadata: EventMetadata,
        /// Fully-qualified topic, e.g. `app.notes.saved`.
        topic: String,
        /// Arbitrary JSON payload.
        data: Value,
    },
}

impl PlatformEvent {
    /// Short machine-readable event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            PlatformEvent::AppStarted { .. } => "app_started",
            PlatformEvent::AppStopped { .. } => "app_stopped",
            PlatformEvent::AppError { .. } => "app_error",
            PlatformEvent::CapabilityMatched { .. } => "capability_matched",
            PlatformEvent::CapabilityMatchFailed { .. } => "capability_match_failed",
            PlatformEvent::Custom { .. } => "custom",
        }
    }

    /// Topic used for filtered subscriptions.
    ///
    /// Lifecycle and routing events live under the `platform.` namespace;
    /// custom events carry their own topic.
    #[must_use]
    pub fn topic(&self) -> String {
        match self {
            PlatformEvent::AppStarted { .. } => "platform.app.started".to_string(),
            PlatformEvent::AppStopped { .. } => "platform.app.stopped".to_string(),
            PlatformEvent::AppError { .. } => "platform.app.error".to_string(),
            PlatformEvent::CapabilityMatched { .. } => "platform.capability.matched".to_string(),
            PlatformEvent::CapabilityMatchFailed { .. } => {
                "platform.capability.match_failed".to_string()
            },
            PlatformEvent::Custom { topic, .. } => topic.clone(),
        }
    }

    /// Event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            PlatformEvent::AppStarted { metadata, .. }
            | PlatformEvent::AppStopped { metadata, .. }
            | PlatformEvent::AppError { metadata, .. }
            | PlatformEvent::CapabilityMatched { metadata, .. }
            | PlatformEvent::CapabilityMatchFailed { metadata, .. }
            | PlatformEvent::Custom { metadata, .. } => metadata,
        }
    }
}
