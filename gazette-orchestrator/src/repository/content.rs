//! Content store
//!
//! Everything a pipeline reads or writes that outlives the run: the workflow
//! configuration, fetched items, saved articles and reports.

use std::path::Path;

use async_trait::async_trait;
use gazette_core::domain::article::{ArticleStyle, GeneratedArticle};
use gazette_core::domain::config::WorkflowConfig;
use gazette_core::domain::item::CandidateItem;
use gazette_core::domain::report::Report;
use gazette_core::dto::cleanup::ContentStats;
use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Loads the workflow configuration; a missing document yields defaults
    async fn load_config(&self) -> Result<WorkflowConfig, StoreError>;

    /// Stores an item; returns whether it was new
    async fn store_item(&self, item: &CandidateItem) -> Result<bool, StoreError>;

    /// Unprocessed items, newest first, at most `limit`
    async fn get_unprocessed_items(&self, limit: usize) -> Result<Vec<CandidateItem>, StoreError>;

    /// Items by id; unknown ids are skipped
    async fn get_items(&self, ids: &[String]) -> Result<Vec<CandidateItem>, StoreError>;

    /// Flags items as consumed by an article written under `topics`
    async fn mark_processed(
        &self,
        items: &[CandidateItem],
        topics: &[String],
    ) -> Result<(), StoreError>;

    /// Formats and saves an article; returns the saved path
    async fn save_article(
        &self,
        article: &GeneratedArticle,
        image: Option<&str>,
        style: ArticleStyle,
        output_dir: &Path,
    ) -> Result<String, StoreError>;

    /// Persists both forms of a report under its id
    async fn persist_report(&self, report: &Report, html: &str) -> Result<(), StoreError>;

    /// Removes stored files that cannot be parsed; returns their names
    async fn cleanup_invalid_files(&self) -> Result<Vec<String>, StoreError>;

    async fn recompute_stats(&self) -> Result<ContentStats, StoreError>;
}
