//! Workflow Orchestrator
//!
//! Runs the named pipelines as fixed sequences of steps. Every step is
//! announced through the progress sink before its work starts, including
//! steps whose work turns out to be a no-op, and cancellation is checked at
//! each step boundary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gazette_core::domain::config::WorkflowConfig;
use gazette_core::domain::item::{CandidateItem, FeedSource};
use gazette_core::domain::report::{PipelineStats, Report, ReportSettings};
use gazette_core::domain::task::{PipelineKind, PipelineOptions, Task, TaskId, TaskStats};
use gazette_core::dto::cleanup::CleanupSummary;
use serde_json::Value;
use thiserror::Error;

use crate::client::{ArticleWriter, ContentAnalyzer, FeedFetcher, ImageGenerator};
use crate::repository::{ContentStore, StoreError};
use crate::service::batch::{ArticleBatch, BatchOutcome};
use crate::service::progress::ProgressSink;
use crate::service::registry::TaskRegistry;
use crate::service::report::{ReportBuilder, render_html};

/// Workflow error type
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to load workflow configuration: {0}")]
    Config(#[source] StoreError),

    #[error("content store error: {0}")]
    Store(#[source] StoreError),

    #[error("failed to persist report: {0}")]
    ReportPersist(#[source] StoreError),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("{0} runs synchronously and is not task-tracked")]
    Untracked(PipelineKind),

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One pre-declared pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub percent: u8,
    pub name: &'static str,
    pub message: &'static str,
}

const fn step(percent: u8, name: &'static str, message: &'static str) -> Step {
    Step {
        percent,
        name,
        message,
    }
}

const LOAD_CONFIG: &str = "Loading configuration";
const FETCH: &str = "Fetching feeds";
const STORE: &str = "Storing new items";
const GENERATE: &str = "Generating articles";
const BUILD_REPORT: &str = "Building report";
const PERSIST_REPORT: &str = "Persisting report";
const DONE: &str = "Done";

pub const FULL_STEPS: [Step; 7] = [
    step(10, "load-config", LOAD_CONFIG),
    step(25, "fetch", FETCH),
    step(50, "store", STORE),
    step(70, "generate", GENERATE),
    step(90, "build-report", BUILD_REPORT),
    step(95, "persist-report", PERSIST_REPORT),
    step(100, "done", DONE),
];

pub const FETCH_STEPS: [Step; 6] = [
    step(15, "load-config", LOAD_CONFIG),
    step(45, "fetch", FETCH),
    step(75, "store", STORE),
    step(90, "build-report", BUILD_REPORT),
    step(95, "persist-report", PERSIST_REPORT),
    step(100, "done", DONE),
];

pub const ANALYZE_STEPS: [Step; 4] = [
    step(10, "load-config", LOAD_CONFIG),
    step(50, "generate", GENERATE),
    step(90, "build-report", "Building and persisting report"),
    step(100, "done", DONE),
];

pub const INCREMENTAL_STEPS: [Step; 8] = [
    step(10, "load-config", LOAD_CONFIG),
    step(20, "check-backlog", "Checking unprocessed backlog"),
    step(35, "fetch", FETCH),
    step(50, "store", STORE),
    step(70, "generate", GENERATE),
    step(90, "build-report", BUILD_REPORT),
    step(95, "persist-report", PERSIST_REPORT),
    step(100, "done", DONE),
];

const NOTHING_TO_PROCESS: &str = "No articles to process: no unprocessed items";
const NOTHING_TO_DO: &str = "Nothing to do: no unprocessed items and nothing new fetched";

/// External capabilities the pipelines are built from
pub struct Collaborators {
    pub fetcher: Arc<dyn FeedFetcher>,
    pub store: Arc<dyn ContentStore>,
    pub analyzer: Arc<dyn ContentAnalyzer>,
    pub writer: Arc<dyn ArticleWriter>,
    pub images: Arc<dyn ImageGenerator>,
}

pub struct WorkflowOrchestrator {
    registry: Arc<TaskRegistry>,
    collaborators: Collaborators,
    /// Used when the workflow configuration names no output directory
    output_dir: PathBuf,
}

/// Settings of one run, resolved from options over configuration
struct RunPlan {
    count: usize,
    target_word_count: usize,
    with_image: bool,
    output_dir: PathBuf,
}

impl WorkflowOrchestrator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        collaborators: Collaborators,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            collaborators,
            output_dir: output_dir.into(),
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Registers a task for the pipeline and runs it in the background
    ///
    /// Returns as soon as the task exists; callers poll it by id.
    pub fn create_and_run_pipeline(
        self: &Arc<Self>,
        kind: PipelineKind,
        options: PipelineOptions,
    ) -> Result<TaskId, WorkflowError> {
        if kind == PipelineKind::Cleanup {
            return Err(WorkflowError::Untracked(kind));
        }

        let id = self.registry.create_task(kind, options.clone());
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            let registry = Arc::clone(&orchestrator.registry);
            let result = registry
                .start_task(id, move |progress| async move {
                    tracing::debug!("Task {} executing {} pipeline", progress.task_id(), kind);
                    let report = orchestrator.run_pipeline(kind, options, &progress).await?;
                    Ok::<Value, WorkflowError>(serde_json::to_value(&report)?)
                })
                .await;

            if let Err(e) = result {
                tracing::debug!("Pipeline task {} ended without a result: {}", id, e);
            }
        });

        Ok(id)
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        self.registry.get_task(id)
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.registry.get_tasks()
    }

    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.registry.cancel_task(id)
    }

    pub fn task_stats(&self) -> TaskStats {
        self.registry.get_stats()
    }

    /// Drops terminal tasks that finished more than `retention` ago
    pub fn evict_finished(&self, retention: Duration) -> usize {
        self.registry.evict_finished(retention)
    }

    /// Store maintenance; synchronous and not task-tracked
    pub async fn run_cleanup(&self) -> Result<CleanupSummary, WorkflowError> {
        let store = &self.collaborators.store;
        let removed_files = store
            .cleanup_invalid_files()
            .await
            .map_err(WorkflowError::Store)?;
        let stats = store.recompute_stats().await.map_err(WorkflowError::Store)?;

        tracing::info!(
            "Cleanup removed {} file(s); {} item(s) stored",
            removed_files.len(),
            stats.total_items
        );
        Ok(CleanupSummary {
            removed_files,
            stats,
        })
    }

    // =========================================================================
    // Pipelines
    // =========================================================================

    /// Runs one pipeline to completion against `progress`
    pub async fn run_pipeline(
        &self,
        kind: PipelineKind,
        options: PipelineOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Report, WorkflowError> {
        tracing::info!("Running {} pipeline", kind);

        match kind {
            PipelineKind::Full => self.run_full(&options, progress).await,
            PipelineKind::Fetch | PipelineKind::FetchSelective => {
                self.run_fetch(kind, &options, progress).await
            }
            PipelineKind::Analyze => self.run_analyze(&options, progress).await,
            PipelineKind::Incremental => self.run_incremental(&options, progress).await,
            PipelineKind::Cleanup => Err(WorkflowError::Untracked(kind)),
        }
    }

    async fn run_full(
        &self,
        options: &PipelineOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Report, WorkflowError> {
        let builder = ReportBuilder::new(PipelineKind::Full, Utc::now());
        let [load, fetch, store, generate, build, persist, done] = FULL_STEPS;
        let mut stats = PipelineStats::default();

        enter(progress, &load)?;
        let config = self.load_config().await?;
        let plan = self.plan(&config, options);

        enter(progress, &fetch)?;
        let items = self.fetch(&config.enabled_feeds(), &config, &mut stats).await;

        enter(progress, &store)?;
        self.store_items(&items, &mut stats).await;

        enter(progress, &generate)?;
        let results = match self
            .generate(&config, &plan, options, progress, generate.percent)
            .await?
        {
            BatchOutcome::NothingToProcess => return Ok(builder.skipped(NOTHING_TO_PROCESS, stats)),
            BatchOutcome::Ran(results) => results,
        };

        enter(progress, &build)?;
        let report = builder.build(results, stats, Some(settings(&config, &plan)));
        let html = render_html(&report);

        enter(progress, &persist)?;
        self.persist(&report, &html).await?;

        enter(progress, &done)?;
        Ok(report)
    }

    async fn run_fetch(
        &self,
        kind: PipelineKind,
        options: &PipelineOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Report, WorkflowError> {
        let builder = ReportBuilder::new(kind, Utc::now());
        let [load, fetch, store, build, persist, done] = FETCH_STEPS;
        let mut stats = PipelineStats::default();

        enter(progress, &load)?;
        let config = self.load_config().await?;

        enter(progress, &fetch)?;
        let sources = if kind == PipelineKind::FetchSelective {
            config.selected_feeds(&options.sources)
        } else {
            config.enabled_feeds()
        };
        let items = self.fetch(&sources, &config, &mut stats).await;

        enter(progress, &store)?;
        self.store_items(&items, &mut stats).await;

        enter(progress, &build)?;
        let report = builder.build(Vec::new(), stats, None);
        let html = render_html(&report);

        enter(progress, &persist)?;
        self.persist(&report, &html).await?;

        enter(progress, &done)?;
        Ok(report)
    }

    async fn run_analyze(
        &self,
        options: &PipelineOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Report, WorkflowError> {
        let builder = ReportBuilder::new(PipelineKind::Analyze, Utc::now());
        let [load, generate, build, done] = ANALYZE_STEPS;
        let stats = PipelineStats::default();

        enter(progress, &load)?;
        let config = self.load_config().await?;
        let plan = self.plan(&config, options);

        enter(progress, &generate)?;
        let results = match self
            .generate(&config, &plan, options, progress, generate.percent)
            .await?
        {
            BatchOutcome::NothingToProcess => return Ok(builder.skipped(NOTHING_TO_PROCESS, stats)),
            BatchOutcome::Ran(results) => results,
        };

        enter(progress, &build)?;
        let report = builder.build(results, stats, Some(settings(&config, &plan)));
        let html = render_html(&report);

        // No separate persist step: the report is written under build-report
        self.persist(&report, &html).await?;

        enter(progress, &done)?;
        Ok(report)
    }

    async fn run_incremental(
        &self,
        options: &PipelineOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Report, WorkflowError> {
        let builder = ReportBuilder::new(PipelineKind::Incremental, Utc::now());
        let [load, backlog, fetch, store, generate, build, persist, done] = INCREMENTAL_STEPS;
        let mut stats = PipelineStats::default();

        enter(progress, &load)?;
        let config = self.load_config().await?;
        let plan = self.plan(&config, options);

        enter(progress, &backlog)?;
        stats.backlog = self
            .collaborators
            .store
            .get_unprocessed_items(usize::MAX)
            .await
            .map_err(WorkflowError::Store)?
            .len();
        let needed = plan.count.saturating_mul(config.items_per_article);
        let skip_fetch = needed > 0 && stats.backlog >= needed;
        if skip_fetch {
            tracing::info!(
                "Backlog of {} item(s) covers {} needed; skipping fetch",
                stats.backlog,
                needed
            );
        }

        enter(progress, &fetch)?;
        let items = if skip_fetch {
            Vec::new()
        } else {
            self.fetch(&config.enabled_feeds(), &config, &mut stats).await
        };

        enter(progress, &store)?;
        self.store_items(&items, &mut stats).await;

        if stats.backlog + stats.new_items == 0 {
            tracing::info!("Incremental run has nothing to do");
            return Ok(builder.skipped(NOTHING_TO_DO, stats));
        }

        enter(progress, &generate)?;
        let results = match self
            .generate(&config, &plan, options, progress, generate.percent)
            .await?
        {
            BatchOutcome::NothingToProcess => return Ok(builder.skipped(NOTHING_TO_PROCESS, stats)),
            BatchOutcome::Ran(results) => results,
        };

        enter(progress, &build)?;
        let report = builder.build(results, stats, Some(settings(&config, &plan)));
        let html = render_html(&report);

        enter(progress, &persist)?;
        self.persist(&report, &html).await?;

        enter(progress, &done)?;
        Ok(report)
    }

    // =========================================================================
    // Step bodies
    // =========================================================================

    async fn load_config(&self) -> Result<WorkflowConfig, WorkflowError> {
        self.collaborators
            .store
            .load_config()
            .await
            .map_err(WorkflowError::Config)
    }

    fn plan(&self, config: &WorkflowConfig, options: &PipelineOptions) -> RunPlan {
        RunPlan {
            count: options.count.unwrap_or(config.article_count),
            target_word_count: options.word_count.unwrap_or(config.target_word_count),
            with_image: options.with_image.unwrap_or(config.image.enabled),
            output_dir: config
                .output_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.output_dir.clone()),
        }
    }

    async fn fetch(
        &self,
        sources: &[FeedSource],
        config: &WorkflowConfig,
        stats: &mut PipelineStats,
    ) -> Vec<CandidateItem> {
        stats.sources = sources.len();
        if sources.is_empty() {
            tracing::info!("No feeds to fetch");
            return Vec::new();
        }

        let items = self
            .collaborators
            .fetcher
            .fetch_candidates(sources, config.items_per_source)
            .await;
        stats.fetched = items.len();
        tracing::info!("Fetched {} item(s) from {} feed(s)", items.len(), sources.len());
        items
    }

    /// Stores fetched items; a failed write skips that item only
    async fn store_items(&self, items: &[CandidateItem], stats: &mut PipelineStats) {
        for item in items {
            match self.collaborators.store.store_item(item).await {
                Ok(new) => {
                    stats.stored += 1;
                    if new {
                        stats.new_items += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping item {}: {}", item.id, e);
                    stats.store_failures += 1;
                }
            }
        }
        tracing::debug!(
            "Stored {} item(s), {} new, {} failed",
            stats.stored,
            stats.new_items,
            stats.store_failures
        );
    }

    async fn generate(
        &self,
        config: &WorkflowConfig,
        plan: &RunPlan,
        options: &PipelineOptions,
        progress: &dyn ProgressSink,
        percent: u8,
    ) -> Result<BatchOutcome, WorkflowError> {
        let batch = ArticleBatch {
            collaborators: &self.collaborators,
            config,
            output_dir: &plan.output_dir,
            target_word_count: plan.target_word_count,
            with_image: plan.with_image,
        };
        batch
            .run(plan.count, &options.item_ids, progress, percent)
            .await
    }

    async fn persist(&self, report: &Report, html: &str) -> Result<(), WorkflowError> {
        self.collaborators
            .store
            .persist_report(report, html)
            .await
            .map_err(WorkflowError::ReportPersist)
    }
}

/// Checks for cancellation, then announces `step`
fn enter(progress: &dyn ProgressSink, step: &Step) -> Result<(), WorkflowError> {
    if progress.cancelled() {
        tracing::info!("Cancelled before step {}", step.name);
        return Err(WorkflowError::Cancelled);
    }
    progress.report(step.percent, step.name, step.message);
    Ok(())
}

fn settings(config: &WorkflowConfig, plan: &RunPlan) -> ReportSettings {
    ReportSettings {
        requested_articles: plan.count,
        target_word_count: plan.target_word_count,
        style: config.style,
        ranking: config.ranking,
    }
}
