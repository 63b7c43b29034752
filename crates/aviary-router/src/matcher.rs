//! Multi-factor capability matching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use aviary_core::ServerId;
use aviary_events::{EventBus, EventMetadata, PlatformEvent};

use crate::cache::{DEFAULT_CACHE_TTL, MatchCache, cache_key};
use crate::category::{CapabilityAvailability, CapabilityCategory};
use crate::error::{RouterError, RouterResult};
use crate::metrics::{MetricsUpdate, ServerMetrics};
use crate::registry::{RegistryEvent, ServiceRegistry};
use crate::rules::RoutingRule;
use crate::score::{Requirements, score_server};
use crate::server::ScoredServer;
use crate::suggest::{BUNDLES, SuggestedBundle};

const EVENT_SOURCE: &str = "router";

/// Matches capability requests to the best available server.
///
/// Registry-owned descriptors are read by value and never written back.
/// Metrics, routing rules, and preferences are matcher-local state; every
/// mutation invalidates cached rankings (coarsely, except routing rules
/// which clear only their capability).
pub struct CapabilityMatcher {
    registry: Arc<dyn ServiceRegistry>,
    bus: EventBus,
    cache: Mutex<MatchCache>,
    metrics: RwLock<HashMap<ServerId, ServerMetrics>>,
    rules: RwLock<HashMap<String, RoutingRule>>,
    preferences: RwLock<HashMap<ServerId, f64>>,
}

impl CapabilityMatcher {
    /// Create a matcher with the default cache TTL.
    #[must_use]
    pub fn new(registry: Arc<dyn ServiceRegistry>, bus: EventBus) -> Self {
        Self::with_ttl(registry, bus, DEFAULT_CACHE_TTL)
    }

    /// Create a matcher with an explicit cache TTL.
    #[must_use]
    pub fn with_ttl(registry: Arc<dyn ServiceRegistry>, bus: EventBus, ttl: Duration) -> Self {
        Self {
            registry,
            bus,
            cache: Mutex::new(MatchCache::new(ttl)),
            metrics: RwLock::new(HashMap::new()),
            rules: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
        }
    }

    /// Rank every server declaring `capability`, best first.
    ///
    /// Serves a cached ranking when one exists within the TTL (no registry
    /// query). A capability nobody declares yields an empty list, not an
    /// error, and is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Registry`] when the registry query fails; a
    /// `capability_match_failed` event is published before the error
    /// propagates.
    pub async fn find_servers_for_capability(
        &self,
        capability: &str,
        requirements: &Requirements,
    ) -> RouterResult<Vec<ScoredServer>> {
        let key = cache_key(capability, requirements);

        {
            let cache = self
                .cache
                .lock()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            if let Some(ranked) = cache.get(&key) {
                debug!(capability, "Capability match served from cache");
                return Ok(ranked);
            }
        }

        let candidates = match self.registry.servers_by_capability(capability).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(capability, error = %e, "Registry query failed");
                self.bus.publish(PlatformEvent::CapabilityMatchFailed {
                    metadata: EventMetadata::new(EVENT_SOURCE),
                    capability: capability.to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            },
        };

        if candidates.is_empty() {
            debug!(capability, "No server declares capability");
            return Ok(Vec::new());
        }

        let mut ranked = {
            let metrics = self
                .metrics
                .read()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            let rules = self
                .rules
                .read()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            let preferences = self
                .preferences
                .read()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            let rule = rules.get(capability);

            candidates
                .into_iter()
                .map(|server| {
                    let score = score_server(
                        &server,
                        metrics.get(&server.id),
                        preferences.get(&server.id).copied(),
                        rule,
                        requirements,
                    );
                    ScoredServer { server, score }
                })
                .collect::<Vec<_>>()
        };
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        {
            let mut cache = self
                .cache
                .lock()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            cache.insert(key, capability, ranked.clone());
        }

        if let Some(top) = ranked.first() {
            info!(
                capability,
                server = %top.server.id,
                score = top.score,
                "Capability matched"
            );
            self.bus.publish(PlatformEvent::CapabilityMatched {
                metadata: EventMetadata::new(EVENT_SOURCE),
                capability: capability.to_string(),
                server_id: top.server.id.clone(),
                score: top.score,
            });
        }

        Ok(ranked)
    }

    /// The top-ranked server for a capability, or `None`.
    ///
    /// # Errors
    ///
    /// Propagates registry failures from
    /// [`find_servers_for_capability`](Self::find_servers_for_capability).
    pub async fn best_server_for_capability(
        &self,
        capability: &str,
        requirements: &Requirements,
    ) -> RouterResult<Option<ScoredServer>> {
        let ranked = self
            .find_servers_for_capability(capability, requirements)
            .await?;
        Ok(ranked.into_iter().next())
    }

    /// Whether any server currently provides a capability.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    pub async fn is_capability_available(&self, capability: &str) -> RouterResult<bool> {
        Ok(self
            .best_server_for_capability(capability, &Requirements::default())
            .await?
            .is_some())
    }

    /// Store a routing rule for one capability.
    ///
    /// Invalidates only that capability's cached rankings.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Internal`] when matcher state is unavailable.
    pub fn set_routing_rule(&self, capability: &str, rule: RoutingRule) -> RouterResult<()> {
        {
            let mut rules = self
                .rules
                .write()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            rules.insert(capability.to_string(), rule);
        }
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| RouterError::Internal(e.to_string()))?;
        cache.invalidate_capability(capability);
        debug!(capability, "Routing rule updated, capability cache cleared");
        Ok(())
    }

    /// The stored routing rule for a capability, if any.
    #[must_use]
    pub fn routing_rule(&self, capability: &str) -> Option<RoutingRule> {
        self.rules
            .read()
            .ok()
            .and_then(|rules| rules.get(capability).cloned())
    }

    /// Bulk-set per-server preference weights.
    ///
    /// Weights apply to every capability, so the whole cache is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPreference`] for any weight outside
    /// `[0, 1]`; no state changes in that case.
    pub fn set_server_preferences(&self, weights: HashMap<ServerId, f64>) -> RouterResult<()> {
        for (server, weight) in &weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(RouterError::InvalidPreference {
                    server: server.to_string(),
                    weight: *weight,
                });
            }
        }
        {
            let mut preferences = self
                .preferences
                .write()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            *preferences = weights;
        }
        self.clear_cache()?;
        debug!("Server preferences replaced, cache cleared");
        Ok(())
    }

    /// Merge a partial metrics update for one server.
    ///
    /// Any metric change can reorder any ranking, so the whole cache is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Internal`] when matcher state is unavailable.
    pub fn update_server_metrics(
        &self,
        server_id: &ServerId,
        update: MetricsUpdate,
    ) -> RouterResult<()> {
        {
            let mut metrics = self
                .metrics
                .write()
                .map_err(|e| RouterError::Internal(e.to_string()))?;
            metrics.entry(server_id.clone()).or_default().apply(update);
        }
        self.clear_cache()?;
        debug!(server = %server_id, "Server metrics updated, cache cleared");
        Ok(())
    }

    /// Current metrics for a server, if any were ever reported.
    #[must_use]
    pub fn server_metrics(&self, server_id: &ServerId) -> Option<ServerMetrics> {
        self.metrics
            .read()
            .ok()
            .and_then(|m| m.get(server_id).cloned())
    }

    /// React to a registry lifecycle event by dropping all cached rankings.
    pub fn handle_registry_event(&self, event: &RegistryEvent) {
        debug!(server = %event.server_id(), ?event, "Registry lifecycle event, cache cleared");
        if let Err(e) = self.clear_cache() {
            warn!(error = %e, "Failed to clear match cache");
        }
    }

    /// Availability of every member capability of a category.
    ///
    /// # Errors
    ///
    /// Propagates registry failures from the per-member queries.
    pub async fn find_capabilities_by_category(
        &self,
        category: CapabilityCategory,
    ) -> RouterResult<HashMap<String, CapabilityAvailability>> {
        let mut result = HashMap::new();
        for capability in category.members() {
            let servers = self
                .find_servers_for_capability(capability, &Requirements::default())
                .await?;
            result.insert(
                (*capability).to_string(),
                CapabilityAvailability {
                    count: servers.len(),
                    best: servers.first().cloned(),
                    servers,
                },
            );
        }
        Ok(result)
    }

    /// The static bundle table filtered by current availability and ranked
    /// by coverage fraction.
    ///
    /// Bundles with no available member are omitted.
    ///
    /// # Errors
    ///
    /// Propagates registry failures from the availability checks.
    pub async fn suggested_capabilities(&self) -> RouterResult<Vec<SuggestedBundle>> {
        let mut suggestions = Vec::new();
        for bundle in BUNDLES {
            let mut available = Vec::new();
            let mut missing = Vec::new();
            for capability in bundle.capabilities {
                if self.is_capability_available(capability).await? {
                    available.push((*capability).to_string());
                } else {
                    missing.push((*capability).to_string());
                }
            }
            if available.is_empty() {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let coverage = available.len() as f64 / bundle.capabilities.len() as f64;
            suggestions.push(SuggestedBundle {
                name: bundle.name.to_string(),
                description: bundle.description.to_string(),
                capabilities: bundle.capabilities.iter().map(ToString::to_string).collect(),
                available,
                missing,
                coverage,
            });
        }
        suggestions.sort_by(|a, b| b.coverage.total_cmp(&a.coverage));
        Ok(suggestions)
    }

    /// Report how well the registry covers a requested capability set.
    ///
    /// # Errors
    ///
    /// Propagates registry failures from the per-capability queries.
    pub async fn analyze_capability_compatibility(
        &self,
        capabilities: &[String],
    ) -> RouterResult<CompatibilityReport> {
        let mut missing = Vec::new();
        let mut providers = HashMap::new();
        let mut available_count = 0usize;

        for capability in capabilities {
            let servers = self
                .find_servers_for_capability(capability, &Requirements::default())
                .await?;
            providers.insert(capability.clone(), servers.len());
            if servers.is_empty() {
                missing.push(capability.clone());
            } else {
                available_count = available_count.saturating_add(1);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let coverage = if capabilities.is_empty() {
            1.0
        } else {
            available_count as f64 / capabilities.len() as f64
        };

        let mut recommendations = Vec::new();
        if coverage < 0.8 {
            for capability in &missing {
                recommendations
                    .push(format!("no server provides '{capability}'; connect one that declares it"));
            }
            if missing.is_empty() {
                recommendations.push("coverage is low; check server statuses".to_string());
            }
        }

        Ok(CompatibilityReport {
            available_count,
            missing,
            providers,
            coverage,
            recommendations,
        })
    }

    fn clear_cache(&self) -> RouterResult<()> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| RouterError::Internal(e.to_string()))?;
        cache.clear();
        Ok(())
    }
}

impl std::fmt::Debug for CapabilityMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let metrics_count = self.metrics.read().map(|m| m.len()).unwrap_or(0);
        let rule_count = self.rules.read().map(|r| r.len()).unwrap_or(0);
        f.debug_struct("CapabilityMatcher")
            .field("metrics_count", &metrics_count)
            .field("rule_count", &rule_count)
            .finish_non_exhaustive()
    }
}

/// Output of [`CapabilityMatcher::analyze_capability_compatibility`].
#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityReport {
    /// How many requested capabilities have at least one provider.
    pub available_count: usize,
    /// Requested capabilities with no provider.
    pub missing: Vec<String>,
    /// Provider count per requested capability.
    pub providers: HashMap<String, usize>,
    /// `available_count / requested`, `1.0` for an empty request.
    pub coverage: f64,
    /// Textual suggestions, populated when coverage is below 0.8.
    pub recommendations: Vec<String>,
}
