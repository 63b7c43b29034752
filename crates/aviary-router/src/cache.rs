//! TTL-bounded cache of ranked capability matches.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::score::Requirements;
use crate::server::ScoredServer;

/// Default time-to-live for cached rankings.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Cache key: blake3 over the capability name and canonical requirements.
type CacheKey = [u8; 32];

pub(crate) fn cache_key(capability: &str, requirements: &Requirements) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(capability.as_bytes());
    hasher.update(&[0]);
    // Requirements is a flat struct, so its JSON form is canonical enough
    // for keying: field order is fixed by the derive.
    if let Ok(json) = serde_json::to_vec(requirements) {
        hasher.update(&json);
    }
    *hasher.finalize().as_bytes()
}

struct CacheEntry {
    capability: String,
    ranked: Vec<ScoredServer>,
    cached_at: Instant,
}

/// Ranked-result cache.
///
/// Invalidation is coarse on purpose: registry lifecycle events, metrics
/// writes, and preference changes clear everything; routing-rule changes
/// clear one capability. The short TTL bounds any staleness that slips
/// through.
pub(crate) struct MatchCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl MatchCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// A cached ranking, never past its TTL.
    pub(crate) fn get(&self, key: &CacheKey) -> Option<Vec<ScoredServer>> {
        let entry = self.entries.get(key)?;
        if entry.cached_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.ranked.clone())
    }

    pub(crate) fn insert(&mut self, key: CacheKey, capability: &str, ranked: Vec<ScoredServer>) {
        self.entries.insert(
            key,
            CacheEntry {
                capability: capability.to_string(),
                ranked,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every entry for one capability (routing-rule change).
    pub(crate) fn invalidate_capability(&mut self, capability: &str) {
        self.entries.retain(|_, e| e.capability != capability);
    }

    /// Drop everything (registry lifecycle, metrics, preferences).
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerDescriptor;

    fn ranked() -> Vec<ScoredServer> {
        vec![ScoredServer {
            server: ServerDescriptor::builtin("a", "A", ["x"]),
            score: 0.8,
        }]
    }

    #[test]
    fn key_varies_with_capability_and_requirements() {
        let base = cache_key("text-generate", &Requirements::default());
        assert_eq!(base, cache_key("text-generate", &Requirements::default()));
        assert_ne!(base, cache_key("image-generate", &Requirements::default()));
        assert_ne!(
            base,
            cache_key("text-generate", &Requirements::min_version("1.0"))
        );
    }

    #[test]
    fn expired_entries_are_never_served() {
        let mut cache = MatchCache::new(Duration::from_millis(0));
        let key = cache_key("text-generate", &Requirements::default());
        cache.insert(key, "text-generate", ranked());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn fresh_entries_are_served() {
        let mut cache = MatchCache::new(Duration::from_secs(60));
        let key = cache_key("text-generate", &Requirements::default());
        cache.insert(key, "text-generate", ranked());
        assert_eq!(cache.get(&key).map(|r| r.len()), Some(1));
    }

    #[test]
    fn capability_invalidation_is_scoped() {
        let mut cache = MatchCache::new(Duration::from_secs(60));
        let text = cache_key("text-generate", &Requirements::default());
        let image = cache_key("image-generate", &Requirements::default());
        cache.insert(text, "text-generate", ranked());
        cache.insert(image, "image-generate", ranked());

        cache.invalidate_capability("text-generate");
        assert!(cache.get(&text).is_none());
        assert!(cache.get(&image).is_some());

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
