//! AI collaborators
//!
//! The orchestrator treats the language and image models as black boxes:
//! items in, analysis out; analysis in, article out; prompt in, image out.

use std::path::Path;

use async_trait::async_trait;
use gazette_core::domain::analysis::{Analysis, AnalyzedArticle, Topic};
use gazette_core::domain::article::GeneratedArticle;
use gazette_core::domain::config::AnalysisConfig;
use gazette_core::domain::item::CandidateItem;
use gazette_core::parse::ParseError;
use thiserror::Error;

/// AI client error type
#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to save image: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a batch of candidate items into a structured analysis
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        items: &[CandidateItem],
        config: &AnalysisConfig,
    ) -> Result<Analysis, AiError>;
}

/// Writes one article from an analysis and the topics chosen for it
#[async_trait]
pub trait ArticleWriter: Send + Sync {
    /// # Arguments
    /// * `analysis` - The full analysis the topics were ranked from
    /// * `topics` - Selected topics, best first
    /// * `high_value` - Analysed articles worth citing
    /// * `target_word_count` - Approximate article length
    async fn generate_article_text(
        &self,
        analysis: &Analysis,
        topics: &[Topic],
        high_value: &[AnalyzedArticle],
        target_word_count: usize,
    ) -> Result<GeneratedArticle, AiError>;
}

/// Produces an optional illustration
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the saved image path, or `None` when image generation is not
    /// available (e.g. no API key)
    async fn generate_image(
        &self,
        prompt: &str,
        output_dir: &Path,
    ) -> Result<Option<String>, AiError>;
}

/// Image generator that never produces an image
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImages;

#[async_trait]
impl ImageGenerator for NoImages {
    async fn generate_image(
        &self,
        _prompt: &str,
        _output_dir: &Path,
    ) -> Result<Option<String>, AiError> {
        Ok(None)
    }
}
