//! Candidate scoring.
//!
//! Each factor contributes additively; the final value is clamped to
//! `[0, 1]`. The weights are fixed platform policy, not configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use aviary_core::Version;

use crate::metrics::ServerMetrics;
use crate::rules::RoutingRule;
use crate::server::{ServerDescriptor, ServerKind, ServerStatus};

/// Requirements attached to a capability request.
///
/// Part of the cache key: two requests with different requirements never
/// share a cached ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    /// Minimum acceptable server version, compared component-wise.
    #[serde(default)]
    pub min_version: Option<String>,
}

impl Requirements {
    /// Require a minimum server version.
    #[must_use]
    pub fn min_version(version: impl Into<String>) -> Self {
        Self {
            min_version: Some(version.into()),
        }
    }
}

const STATUS_RUNNING_BONUS: f64 = 0.3;
const BUILTIN_BONUS: f64 = 0.2;
const RESPONSE_TIME_WEIGHT: f64 = 0.2;
const RESPONSE_TIME_CEILING_MS: f64 = 5000.0;
const SUCCESS_RATE_WEIGHT: f64 = 0.2;
const LOAD_WEIGHT: f64 = 0.1;
const NO_METRICS_DEFAULT: f64 = 0.3;
const PREFERENCE_WEIGHT: f64 = 0.1;
const VERSION_OK_BONUS: f64 = 0.1;
const VERSION_FAIL_PENALTY: f64 = 0.2;

/// Score one candidate server.
///
/// `metrics`, `preference` and `rule` are the matcher's local state for this
/// server/capability; `requirements` comes from the caller.
#[must_use]
pub(crate) fn score_server(
    server: &ServerDescriptor,
    metrics: Option<&ServerMetrics>,
    preference: Option<f64>,
    rule: Option<&RoutingRule>,
    requirements: &Requirements,
) -> f64 {
    let mut score = 0.0;

    if server.status == ServerStatus::Running {
        score += STATUS_RUNNING_BONUS;
    }
    if server.kind == ServerKind::Builtin {
        score += BUILTIN_BONUS;
    }

    match metrics {
        Some(m) => {
            if let Some(avg_ms) = m.avg_response_time_ms {
                score += RESPONSE_TIME_WEIGHT * (1.0 - avg_ms / RESPONSE_TIME_CEILING_MS).max(0.0);
            }
            if let Some(rate) = m.success_rate {
                score += SUCCESS_RATE_WEIGHT * rate;
            }
            if let Some(load) = m.current_load {
                score += LOAD_WEIGHT * (1.0 - load).max(0.0);
            }
        },
        None => {
            // Assumed-performance default for servers we have never observed.
            score += NO_METRICS_DEFAULT;
        },
    }

    if let Some(weight) = preference {
        score += weight * PREFERENCE_WEIGHT;
    }

    if let Some(rule) = rule {
        score += rule.bonus_for(&server.id);
    }

    if let Some(min) = &requirements.min_version {
        score += version_adjustment(server, min);
    }

    score.clamp(0.0, 1.0)
}

/// Version bonus/penalty against a minimum requirement.
///
/// A server without a parseable version is treated as `0.0.0`; a malformed
/// *requirement* is ignored rather than failing every candidate.
fn version_adjustment(server: &ServerDescriptor, min: &str) -> f64 {
    let Ok(min) = min.parse::<Version>() else {
        warn!(server = %server.id, min_version = min, "Unparseable min_version requirement, ignoring");
        return 0.0;
    };
    let reported = server
        .version
        .as_deref()
        .and_then(|v| v.parse::<Version>().ok())
        .unwrap_or_default();
    if reported.satisfies_min(&min) {
        VERSION_OK_BONUS
    } else {
        -VERSION_FAIL_PENALTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsUpdate;

    fn builtin_running() -> ServerDescriptor {
        ServerDescriptor::builtin("a", "A", ["text-generate"])
    }

    #[test]
    fn builtin_running_no_metrics_scores_exactly_point_eight() {
        let score = score_server(&builtin_running(), None, None, None, &Requirements::default());
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn external_with_metrics_scores_below_assumed_builtin() {
        let server = ServerDescriptor::external("b", "B", ["text-generate"]);
        let mut metrics = ServerMetrics::default();
        metrics.apply(MetricsUpdate {
            avg_response_time_ms: Some(200.0),
            success_rate: Some(0.99),
            current_load: Some(0.1),
        });

        let score = score_server(&server, Some(&metrics), None, None, &Requirements::default());
        let expected = 0.3 + 0.2 * (1.0 - 200.0 / 5000.0) + 0.2 * 0.99 + 0.1 * (1.0 - 0.1);
        assert!((score - expected).abs() < 1e-9);
        assert!(score < 0.8);
    }

    #[test]
    fn slow_server_gets_no_response_time_credit() {
        let server = ServerDescriptor::external("b", "B", ["x"]);
        let mut metrics = ServerMetrics::default();
        metrics.apply(MetricsUpdate::response_time(9000.0));

        let score = score_server(&server, Some(&metrics), None, None, &Requirements::default());
        // Running bonus only: response-time term floors at zero.
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn preference_and_rule_contribute() {
        let server = builtin_running();
        let rule = RoutingRule::new().with_bonus("a", 0.05);
        let score = score_server(&server, None, Some(1.0), Some(&rule), &Requirements::default());
        assert!((score - (0.8 + 0.1 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn version_bonus_and_penalty() {
        let server = builtin_running().with_version("1.2");
        let ok = score_server(&server, None, None, None, &Requirements::min_version("1.0"));
        assert!((ok - 0.9).abs() < 1e-9);

        let fail = score_server(&server, None, None, None, &Requirements::min_version("2.0"));
        assert!((fail - 0.6).abs() < 1e-9);
    }

    #[test]
    fn missing_version_fails_requirement() {
        let server = builtin_running();
        let score = score_server(&server, None, None, None, &Requirements::min_version("0.1"));
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped() {
        let server = builtin_running();
        let rule = RoutingRule::new().with_bonus("a", 5.0);
        let high = score_server(&server, None, None, Some(&rule), &Requirements::default());
        assert!((high - 1.0).abs() < f64::EPSILON);

        let demote = RoutingRule::new().with_bonus("a", -5.0);
        let low = score_server(&server, None, None, Some(&demote), &Requirements::default());
        assert!(low.abs() < f64::EPSILON);
    }
}
