//! Analysis domain types
//!
//! Output of the AI analysis of a batch of candidate items. Topics are
//! ephemeral: produced and consumed within a single pipeline run.

use serde::{Deserialize, Serialize};

use crate::parse::{self, ParseError, lenient_score, lenient_string, lenient_strings};

/// An AI-derived thematic cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub actions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub novelty_score: f64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub impact_score: f64,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub related_articles: Vec<String>,
}

/// A source article as judged by the analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedArticle {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub link: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub value_score: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,
}

/// Structured analysis of a batch of candidate items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub articles: Vec<AnalyzedArticle>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub trends: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub best_practices: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub anti_patterns: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub open_questions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
}

impl Analysis {
    /// Parses a model response into an analysis
    ///
    /// A response without any topic is rejected: nothing downstream can be
    /// written from it.
    pub fn from_response(response: &str) -> Result<Self, ParseError> {
        let analysis: Analysis = parse::parse_json(response)?;
        if analysis.topics.is_empty() {
            return Err(ParseError::MissingField("topics"));
        }
        Ok(analysis)
    }
}
