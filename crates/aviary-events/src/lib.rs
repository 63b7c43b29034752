//! Aviary Events - Event bus for the Aviary app platform.
//!
//! This crate provides:
//! - Event types for app lifecycle and capability routing
//! - A broadcast-based event bus for async subscribers
//! - Topic-filtered subscriptions with trailing-wildcard matching
//!
//! # Example
//!
//! ```rust
//! use aviary_events::{EventBus, EventMetadata, PlatformEvent};
//! use aviary_core::AppId;
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(PlatformEvent::AppStarted {
//!     metadata: EventMetadata::new("runtime"),
//!     app_id: AppId::new("notes"),
//!     name: "Notes".to_string(),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "app_started");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod event;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EventMetadata, PlatformEvent};
