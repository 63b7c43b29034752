//! Capability categories and their member capabilities.

use serde::{Deserialize, Serialize};

use crate::server::ScoredServer;

/// Closed set of capability categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    /// File reading, writing, and search.
    FileSystem,
    /// Structured data queries.
    Database,
    /// Web search and fetch.
    Web,
    /// Text generation and transformation.
    AiText,
    /// Image generation and analysis.
    AiImage,
    /// Key/value storage.
    Storage,
    /// Host system introspection.
    System,
    /// Cross-app operations.
    Apps,
}

impl CapabilityCategory {
    /// All categories, in declaration order.
    pub const ALL: [CapabilityCategory; 8] = [
        CapabilityCategory::FileSystem,
        CapabilityCategory::Database,
        CapabilityCategory::Web,
        CapabilityCategory::AiText,
        CapabilityCategory::AiImage,
        CapabilityCategory::Storage,
        CapabilityCategory::System,
        CapabilityCategory::Apps,
    ];

    /// The fixed member capabilities of this category.
    #[must_use]
    pub fn members(&self) -> &'static [&'static str] {
        match self {
            CapabilityCategory::FileSystem => &["file-read", "file-write", "file-search"],
            CapabilityCategory::Database => &["db-query", "db-execute"],
            CapabilityCategory::Web => &["web-search", "web-fetch"],
            CapabilityCategory::AiText => &["text-generate", "text-summarize", "text-translate"],
            CapabilityCategory::AiImage => &["image-generate", "image-analyze"],
            CapabilityCategory::Storage => &["kv-get", "kv-set"],
            CapabilityCategory::System => &["system-info"],
            CapabilityCategory::Apps => &["app-list", "app-message"],
        }
    }
}

/// Availability summary for one capability within a category query.
#[derive(Debug, Clone)]
pub struct CapabilityAvailability {
    /// Number of candidate servers.
    pub count: usize,
    /// Top-ranked server, if any.
    pub best: Option<ScoredServer>,
    /// All candidates, ranked.
    pub servers: Vec<ScoredServer>,
}
