//! Workflow configuration
//!
//! The document loaded at the start of every pipeline run. It describes what
//! to fetch and how to select and write; process-level settings such as bind
//! addresses and API keys live with the orchestrator binary instead.

use serde::{Deserialize, Serialize};

use crate::domain::article::ArticleStyle;
use crate::domain::item::FeedSource;

/// Per-run workflow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub feeds: Vec<FeedSource>,
    /// Items kept per feed on each fetch
    pub items_per_source: usize,
    /// Articles generated when the caller does not ask for a count
    pub article_count: usize,
    /// Candidate items fed into one analysis
    pub items_per_article: usize,
    pub target_word_count: usize,
    pub ranking: RankingConfig,
    pub analysis: AnalysisConfig,
    pub image: ImageConfig,
    pub style: ArticleStyle,
    /// Where articles are written; the orchestrator default applies when unset
    pub output_dir: Option<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            items_per_source: 10,
            article_count: 1,
            items_per_article: 8,
            target_word_count: 1200,
            ranking: RankingConfig::default(),
            analysis: AnalysisConfig::default(),
            image: ImageConfig::default(),
            style: ArticleStyle::default(),
            output_dir: None,
        }
    }
}

impl WorkflowConfig {
    /// Feeds that are switched on
    pub fn enabled_feeds(&self) -> Vec<FeedSource> {
        self.feeds.iter().filter(|f| f.enabled).cloned().collect()
    }

    /// Enabled feeds whose name is in `names` (case-insensitive)
    pub fn selected_feeds(&self, names: &[String]) -> Vec<FeedSource> {
        self.feeds
            .iter()
            .filter(|f| f.enabled && names.iter().any(|n| n.eq_ignore_ascii_case(&f.name)))
            .cloned()
            .collect()
    }
}

/// Thresholds for topic and article selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub min_novelty_score: f64,
    pub min_impact_score: f64,
    pub min_value_score: f64,
    pub max_topics: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_novelty_score: 6.0,
            min_impact_score: 6.0,
            min_value_score: 7.0,
            max_topics: 3,
        }
    }
}

/// Instructions passed to the analysis model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub language: String,
    /// Subject areas the analysis should favour
    pub focus: Vec<String>,
    /// Characters of item content included in the prompt
    pub max_content_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            focus: Vec::new(),
            max_content_chars: 1500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub enabled: bool,
}
