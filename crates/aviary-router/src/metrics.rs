//! Per-server performance metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observed performance of one server.
///
/// Fields are optional because telemetry may report them independently;
/// a server with no [`ServerMetrics`] entry at all is scored with the
/// assumed-performance default instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMetrics {
    /// Average response time in milliseconds.
    pub avg_response_time_ms: Option<f64>,
    /// Fraction of successful requests, in `[0, 1]`.
    pub success_rate: Option<f64>,
    /// Current load, in `[0, 1]`.
    pub current_load: Option<f64>,
    /// When any field was last written.
    pub last_updated: Option<DateTime<Utc>>,
}

impl ServerMetrics {
    /// Merge a partial update, stamping `last_updated`.
    pub fn apply(&mut self, update: MetricsUpdate) {
        if let Some(v) = update.avg_response_time_ms {
            self.avg_response_time_ms = Some(v);
        }
        if let Some(v) = update.success_rate {
            self.success_rate = Some(v);
        }
        if let Some(v) = update.current_load {
            self.current_load = Some(v);
        }
        self.last_updated = Some(Utc::now());
    }
}

/// A partial metrics report from telemetry or self-reporting servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsUpdate {
    /// Average response time in milliseconds.
    pub avg_response_time_ms: Option<f64>,
    /// Fraction of successful requests, in `[0, 1]`.
    pub success_rate: Option<f64>,
    /// Current load, in `[0, 1]`.
    pub current_load: Option<f64>,
}

impl MetricsUpdate {
    /// Update only the average response time.
    #[must_use]
    pub fn response_time(ms: f64) -> Self {
        Self {
            avg_response_time_ms: Some(ms),
            ..Self::default()
        }
    }

    /// Update only the success rate.
    #[must_use]
    pub fn success_rate(rate: f64) -> Self {
        Self {
            success_rate: Some(rate),
            ..Self::default()
        }
    }

    /// Update only the current load.
    #[must_use]
    pub fn load(load: f64) -> Self {
        Self {
            current_load: Some(load),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_merge_keeps_existing_fields() {
        let mut metrics = ServerMetrics::default();
        metrics.apply(MetricsUpdate {
            avg_response_time_ms: Some(200.0),
            success_rate: Some(0.99),
            current_load: None,
        });
        metrics.apply(MetricsUpdate::load(0.4));

        assert_eq!(metrics.avg_response_time_ms, Some(200.0));
        assert_eq!(metrics.success_rate, Some(0.99));
        assert_eq!(metrics.current_load, Some(0.4));
        assert!(metrics.last_updated.is_some());
    }
}
