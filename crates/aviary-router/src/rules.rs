//! Per-capability routing rules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aviary_core::ServerId;

/// Preference overrides for one capability.
///
/// Bonuses are added verbatim to the matching server's score before
/// clamping; negative bonuses demote a server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Per-server score bonus.
    pub server_bonus: HashMap<ServerId, f64>,
}

impl RoutingRule {
    /// Create an empty rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bonus for one server.
    #[must_use]
    pub fn with_bonus(mut self, server: impl Into<ServerId>, bonus: f64) -> Self {
        self.server_bonus.insert(server.into(), bonus);
        self
    }

    /// Bonus for a server, zero when the rule does not mention it.
    #[must_use]
    pub fn bonus_for(&self, server: &ServerId) -> f64 {
        self.server_bonus.get(server).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonus_defaults_to_zero() {
        let rule = RoutingRule::new().with_bonus("claude", 0.15);
        assert!((rule.bonus_for(&ServerId::new("claude")) - 0.15).abs() < f64::EPSILON);
        assert!(rule.bonus_for(&ServerId::new("other")).abs() < f64::EPSILON);
    }
}
