//! Aviary Router - Capability matching over an external service registry.
//!
//! This crate provides:
//! - The [`ServiceRegistry`] interface consumed from the hosting environment
//! - [`CapabilityMatcher`]: multi-factor scoring and ranking of candidate
//!   servers, with a TTL-bounded result cache
//! - Per-server metrics ingestion, per-capability routing rules, and global
//!   server preferences
//! - Category tables, static capability bundles, and compatibility analysis
//!
//! # Architecture
//!
//! The matcher never owns server state. It queries the registry for servers
//! declaring a capability, scores each candidate from descriptor fields plus
//! locally-held metrics/preferences/rules, and caches the ranked list.
//! Invalidation is deliberately coarse: any registry lifecycle event, metrics
//! update, or preference change clears the whole cache, and the short TTL
//! bounds staleness. Routing-rule changes clear only that capability's
//! entries.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aviary_events::EventBus;
//! use aviary_router::{CapabilityMatcher, Requirements, StaticRegistry, ServerDescriptor};
//!
//! # async fn example() -> Result<(), aviary_router::RouterError> {
//! let registry = Arc::new(StaticRegistry::new());
//! registry.register(ServerDescriptor::builtin("claude", "Claude", ["text-generate"]));
//!
//! let matcher = CapabilityMatcher::new(registry, EventBus::new());
//! let ranked = matcher
//!     .find_servers_for_capability("text-generate", &Requirements::default())
//!     .await?;
//! assert_eq!(ranked.len(), 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cache;
mod category;
mod error;
mod matcher;
mod metrics;
mod registry;
mod rules;
mod score;
mod server;
mod suggest;

pub use cache::DEFAULT_CACHE_TTL;
pub use category::{CapabilityAvailability, CapabilityCategory};
pub use error::{RouterError, RouterResult};
pub use matcher::{CapabilityMatcher, CompatibilityReport};
pub use metrics::{MetricsUpdate, ServerMetrics};
pub use registry::{RegistryEvent, ServiceRegistry, StaticRegistry};
pub use rules::RoutingRule;
pub use score::Requirements;
pub use server::{ScoredServer, ServerDescriptor, ServerKind, ServerStatus};
pub use suggest::{CapabilityBundle, SuggestedBundle};
