//! Candidate item domain types
//!
//! A candidate item is one fetched source article that has not necessarily
//! been written about yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An RSS-sourced article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Feed guid, or a UUIDv5 of the link when the feed provides none
    pub id: String,
    pub title: String,
    /// Name of the feed the item came from
    pub source: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub content: String,
    /// Set by the store once an article has consumed this item
    #[serde(default)]
    pub processed: bool,
    /// Topic titles the item was written up under
    #[serde(default)]
    pub topics: Vec<String>,
}

impl CandidateItem {
    /// Creates a new unprocessed item
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        guid: Option<String>,
        published_at: Option<DateTime<Utc>>,
        content: impl Into<String>,
    ) -> Self {
        let link = link.into();
        let id = guid
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, link.as_bytes()).to_string());

        Self {
            id,
            title: title.into(),
            source: source.into(),
            link,
            published_at,
            content: content.into(),
            processed: false,
            topics: Vec::new(),
        }
    }
}

/// Filesystem-safe key for an item id
pub fn storage_key(id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes())
        .simple()
        .to_string()
}

/// A configured feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "FeedSource::default_enabled")]
    pub enabled: bool,
}

impl FeedSource {
    fn default_enabled() -> bool {
        true
    }
}
