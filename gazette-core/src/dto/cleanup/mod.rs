//! Cleanup DTOs for the orchestrator API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content counters recomputed by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    pub total_items: usize,
    pub processed_items: usize,
    pub unprocessed_items: usize,
    pub reports: usize,
    pub computed_at: Option<DateTime<Utc>>,
}

/// Result of the synchronous cleanup pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupSummary {
    /// Files removed because they could not be parsed
    pub removed_files: Vec<String>,
    pub stats: ContentStats,
}
