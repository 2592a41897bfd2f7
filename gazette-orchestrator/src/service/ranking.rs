//! Ranking Strategy
//!
//! Decides which topics an article is written from, which analysed articles
//! are worth citing, and which stored items feed the next analysis. Pure
//! functions of their input: no I/O and no side effects.

use std::cmp::Ordering;

use gazette_core::domain::analysis::{AnalyzedArticle, Topic};
use gazette_core::domain::config::RankingConfig;
use gazette_core::domain::item::CandidateItem;
use serde::Serialize;

/// A topic together with its combined score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTopic {
    pub topic: Topic,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RankingStrategy {
    config: RankingConfig,
}

impl RankingStrategy {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Top topics by `novelty + impact`
    ///
    /// Topics under either threshold are dropped unless that would drop all
    /// of them, in which case every topic competes. Ties keep input order.
    /// Returns at most `max(1, max_topics)` entries and never an empty list
    /// for a non-empty input.
    pub fn select_topics(&self, topics: &[Topic]) -> Vec<RankedTopic> {
        let scored: Vec<RankedTopic> = topics
            .iter()
            .map(|topic| RankedTopic {
                score: finite(topic.novelty_score) + finite(topic.impact_score),
                topic: topic.clone(),
            })
            .collect();

        let passing: Vec<RankedTopic> = scored
            .iter()
            .filter(|ranked| {
                finite(ranked.topic.novelty_score) >= self.config.min_novelty_score
                    && finite(ranked.topic.impact_score) >= self.config.min_impact_score
            })
            .cloned()
            .collect();

        let mut chosen = if passing.is_empty() { scored } else { passing };

        // sort_by is stable
        chosen.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        chosen.truncate(self.config.max_topics.max(1));
        chosen
    }

    /// Analysed articles at or above the value threshold, in input order
    pub fn high_value_articles(&self, articles: &[AnalyzedArticle]) -> Vec<AnalyzedArticle> {
        articles
            .iter()
            .filter(|article| finite(article.value_score) >= self.config.min_value_score)
            .cloned()
            .collect()
    }
}

/// Unprocessed items for the next analysis, newest first
///
/// Undated items sort after dated ones; equal dates keep input order.
pub fn select_candidates(items: &[CandidateItem], limit: usize) -> Vec<CandidateItem> {
    let mut candidates: Vec<CandidateItem> =
        items.iter().filter(|item| !item.processed).cloned().collect();

    candidates.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    candidates.truncate(limit);
    candidates
}

fn finite(score: f64) -> f64 {
    if score.is_finite() { score } else { 0.0 }
}
