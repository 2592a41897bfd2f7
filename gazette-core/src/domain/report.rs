//! Report domain types
//!
//! One report is produced per pipeline run. It is immutable once built and is
//! persisted in a structured (JSON) and a rendered (HTML) form that share the
//! same identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::article::ArticleStyle;
use crate::domain::config::RankingConfig;
use crate::domain::task::PipelineKind;

/// One article produced by a batch iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleOutcome {
    /// 1-based iteration number within the batch
    pub iteration: usize,
    pub title: String,
    /// Where the formatted article was saved
    pub path: String,
    pub image: Option<String>,
    /// Titles of the topics the article was written from
    pub topics: Vec<String>,
    /// Ids of the candidate items consumed
    pub source_items: Vec<String>,
}

/// Stage of a batch iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IterationStage {
    Select,
    Analyze,
    Generate,
    Save,
    MarkProcessed,
}

impl fmt::Display for IterationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IterationStage::Select => "select",
            IterationStage::Analyze => "analyze",
            IterationStage::Generate => "generate",
            IterationStage::Save => "save",
            IterationStage::MarkProcessed => "mark-processed",
        };
        f.write_str(name)
    }
}

/// Why a batch iteration produced no article
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("iteration {iteration} failed during {stage}: {message}")]
pub struct IterationError {
    pub iteration: usize,
    pub stage: IterationStage,
    pub message: String,
}

impl IterationError {
    pub fn new(iteration: usize, stage: IterationStage, cause: impl fmt::Display) -> Self {
        Self {
            iteration,
            stage,
            message: cause.to_string(),
        }
    }
}

/// Counters gathered while a pipeline runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub sources: usize,
    pub fetched: usize,
    pub stored: usize,
    pub new_items: usize,
    pub backlog: usize,
    /// Items whose write failed and were skipped
    #[serde(default)]
    pub store_failures: usize,
}

/// Snapshot of the configuration the run used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub requested_articles: usize,
    pub target_word_count: usize,
    pub style: ArticleStyle,
    pub ranking: RankingConfig,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Timestamp-derived id shared by the JSON and HTML forms
    pub id: String,
    pub kind: PipelineKind,
    pub success: bool,
    /// Explanation when the run stopped early or produced nothing
    pub message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub generated_count: usize,
    pub articles: Vec<ArticleOutcome>,
    pub failures: Vec<IterationError>,
    pub stats: PipelineStats,
    pub settings: Option<ReportSettings>,
}
