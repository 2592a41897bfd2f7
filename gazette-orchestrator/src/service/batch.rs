//! Article batch
//!
//! The `generate` step: produce up to `count` articles, one independent
//! iteration each. An iteration that fails is recorded and the loop moves
//! on; it never takes the rest of the batch down with it.

use std::path::Path;

use gazette_core::domain::config::WorkflowConfig;
use gazette_core::domain::item::CandidateItem;
use gazette_core::domain::report::{ArticleOutcome, IterationError, IterationStage};

use crate::service::progress::ProgressSink;
use crate::service::ranking::{self, RankingStrategy};
use crate::service::workflow::{Collaborators, WorkflowError};

/// What a batch did
#[derive(Debug)]
pub enum BatchOutcome {
    /// The first iteration found no candidates
    NothingToProcess,
    /// One entry per iteration that had candidates
    Ran(Vec<Result<ArticleOutcome, IterationError>>),
}

pub struct ArticleBatch<'a> {
    pub collaborators: &'a Collaborators,
    pub config: &'a WorkflowConfig,
    pub output_dir: &'a Path,
    pub target_word_count: usize,
    pub with_image: bool,
}

impl ArticleBatch<'_> {
    /// Runs up to `count` iterations
    ///
    /// `item_ids`, when given, are the candidates of the first iteration;
    /// later iterations select automatically. Each iteration re-announces the
    /// current step at `percent` so the task shows which article is underway.
    pub async fn run(
        &self,
        count: usize,
        item_ids: &[String],
        progress: &dyn ProgressSink,
        percent: u8,
    ) -> Result<BatchOutcome, WorkflowError> {
        let mut results = Vec::new();

        for iteration in 1..=count {
            if progress.cancelled() {
                return Err(WorkflowError::Cancelled);
            }
            progress.report(
                percent,
                "generate",
                &format!("Generating article {}/{}", iteration, count),
            );

            let candidates = match self.select(iteration, item_ids).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!("{}", e);
                    results.push(Err(e));
                    continue;
                }
            };

            if candidates.is_empty() {
                if iteration == 1 {
                    tracing::info!("No unprocessed items; nothing to generate");
                    return Ok(BatchOutcome::NothingToProcess);
                }
                tracing::info!("Candidates exhausted after {} iteration(s)", iteration - 1);
                break;
            }

            let outcome = self.produce(iteration, candidates).await;
            match &outcome {
                Ok(article) => tracing::info!(
                    "Iteration {}/{} produced \"{}\"",
                    iteration,
                    count,
                    article.title
                ),
                Err(e) => tracing::warn!("{}", e),
            }
            results.push(outcome);
        }

        Ok(BatchOutcome::Ran(results))
    }

    async fn select(
        &self,
        iteration: usize,
        item_ids: &[String],
    ) -> Result<Vec<CandidateItem>, IterationError> {
        let store = &self.collaborators.store;

        if iteration == 1 && !item_ids.is_empty() {
            return store
                .get_items(item_ids)
                .await
                .map_err(|e| IterationError::new(iteration, IterationStage::Select, e));
        }

        let unprocessed = store
            .get_unprocessed_items(self.config.items_per_article)
            .await
            .map_err(|e| IterationError::new(iteration, IterationStage::Select, e))?;
        Ok(ranking::select_candidates(
            &unprocessed,
            self.config.items_per_article,
        ))
    }

    async fn produce(
        &self,
        iteration: usize,
        candidates: Vec<CandidateItem>,
    ) -> Result<ArticleOutcome, IterationError> {
        let analysis = self
            .collaborators
            .analyzer
            .analyze(&candidates, &self.config.analysis)
            .await
            .map_err(|e| IterationError::new(iteration, IterationStage::Analyze, e))?;

        let strategy = RankingStrategy::new(self.config.ranking);
        let topics: Vec<_> = strategy
            .select_topics(&analysis.topics)
            .into_iter()
            .map(|ranked| ranked.topic)
            .collect();
        if topics.is_empty() {
            return Err(IterationError::new(
                iteration,
                IterationStage::Analyze,
                "analysis produced no topics",
            ));
        }
        let high_value = strategy.high_value_articles(&analysis.articles);

        let article = self
            .collaborators
            .writer
            .generate_article_text(&analysis, &topics, &high_value, self.target_word_count)
            .await
            .map_err(|e| IterationError::new(iteration, IterationStage::Generate, e))?;

        let image = match article.image_prompt() {
            Some(prompt) if self.with_image => {
                match self
                    .collaborators
                    .images
                    .generate_image(prompt, self.output_dir)
                    .await
                {
                    Ok(image) => image,
                    Err(e) => {
                        tracing::warn!("Image generation skipped: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let path = self
            .collaborators
            .store
            .save_article(&article, image.as_deref(), self.config.style, self.output_dir)
            .await
            .map_err(|e| IterationError::new(iteration, IterationStage::Save, e))?;

        let topic_titles: Vec<String> = topics.iter().map(|t| t.title.clone()).collect();
        self.collaborators
            .store
            .mark_processed(&candidates, &topic_titles)
            .await
            .map_err(|e| IterationError::new(iteration, IterationStage::MarkProcessed, e))?;

        Ok(ArticleOutcome {
            iteration,
            title: article.title,
            path,
            image,
            topics: topic_titles,
            source_items: candidates.into_iter().map(|item| item.id).collect(),
        })
    }
}
