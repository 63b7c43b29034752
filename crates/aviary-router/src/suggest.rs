//! Static capability bundle suggestions.
//!
//! The bundle table is hand-authored platform data. Suggestions are this
//! table filtered by what the registry can currently provide; nothing here
//! is learned from usage.

use serde::Serialize;

/// A hand-authored bundle of capabilities that work well together.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityBundle {
    /// Bundle identifier.
    pub name: &'static str,
    /// What apps built on this bundle look like.
    pub description: &'static str,
    /// Member capabilities.
    pub capabilities: &'static [&'static str],
}

/// The fixed suggestion table.
pub(crate) const BUNDLES: &[CapabilityBundle] = &[
    CapabilityBundle {
        name: "writing-assistant",
        description: "Draft, summarize, and save documents",
        capabilities: &["text-generate", "text-summarize", "file-write"],
    },
    CapabilityBundle {
        name: "research",
        description: "Search the web and condense findings",
        capabilities: &["web-search", "web-fetch", "text-summarize"],
    },
    CapabilityBundle {
        name: "data-explorer",
        description: "Query databases and browse result files",
        capabilities: &["db-query", "db-execute", "file-read"],
    },
    CapabilityBundle {
        name: "media-studio",
        description: "Generate and analyze images",
        capabilities: &["image-generate", "image-analyze", "file-write"],
    },
    CapabilityBundle {
        name: "app-dashboard",
        description: "Observe and coordinate other apps",
        capabilities: &["app-list", "app-message", "kv-get"],
    },
];

/// A bundle together with its current availability.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedBundle {
    /// Bundle identifier.
    pub name: String,
    /// Bundle description.
    pub description: String,
    /// All member capabilities.
    pub capabilities: Vec<String>,
    /// Members with at least one provider right now.
    pub available: Vec<String>,
    /// Members without any provider.
    pub missing: Vec<String>,
    /// `available.len() / capabilities.len()`, in `(0, 1]` for returned
    /// bundles; fully-unavailable bundles are filtered out.
    pub coverage: f64,
}
