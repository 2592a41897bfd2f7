//! In-memory collaborators for tests

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use gazette_core::domain::analysis::{Analysis, AnalyzedArticle, Topic};
use gazette_core::domain::article::{ArticleStyle, GeneratedArticle};
use gazette_core::domain::config::{AnalysisConfig, WorkflowConfig};
use gazette_core::domain::item::{CandidateItem, FeedSource};
use gazette_core::domain::report::Report;
use gazette_core::dto::cleanup::ContentStats;
use gazette_core::parse::ParseError;

use crate::client::{AiError, ArticleWriter, ContentAnalyzer, FeedFetcher, ImageGenerator};
use crate::repository::{ContentStore, StoreError};
use crate::service::ranking::select_candidates;
use crate::service::registry::TaskRegistry;
use crate::service::workflow::{Collaborators, WorkflowOrchestrator};

#[derive(Default)]
pub struct FakeFetcher {
    pub items: Vec<CandidateItem>,
    pub requested: Mutex<Vec<String>>,
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch_candidates(
        &self,
        sources: &[FeedSource],
        _limit_per_source: usize,
    ) -> Vec<CandidateItem> {
        let names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();
        self.requested.lock().unwrap().extend(names.iter().cloned());
        self.items
            .iter()
            .filter(|item| names.contains(&item.source))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub config: WorkflowConfig,
    pub broken_config: bool,
    pub broken_reports: bool,
    /// Id whose `store_item` call fails
    pub failing_item: Option<String>,
    pub items: Mutex<BTreeMap<String, CandidateItem>>,
    pub articles: Mutex<Vec<String>>,
    pub reports: Mutex<Vec<Report>>,
}

impl MemoryStore {
    pub fn with_config(config: WorkflowConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn seed(&self, items: &[CandidateItem]) {
        let mut stored = self.items.lock().unwrap();
        for item in items {
            stored.insert(item.id.clone(), item.clone());
        }
    }

    pub fn processed_ids(&self) -> Vec<String> {
        self.items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.processed)
            .map(|item| item.id.clone())
            .collect()
    }
}

pub fn store_failure() -> StoreError {
    StoreError::Io {
        path: "memory".to_string(),
        source: std::io::Error::other("disk full"),
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn load_config(&self) -> Result<WorkflowConfig, StoreError> {
        if self.broken_config {
            return Err(StoreError::InvalidConfig {
                path: "config.json".to_string(),
                message: "expected value".to_string(),
            });
        }
        Ok(self.config.clone())
    }

    async fn store_item(&self, item: &CandidateItem) -> Result<bool, StoreError> {
        if self.failing_item.as_deref() == Some(item.id.as_str()) {
            return Err(store_failure());
        }
        let mut items = self.items.lock().unwrap();
        if items.contains_key(&item.id) {
            return Ok(false);
        }
        items.insert(item.id.clone(), item.clone());
        Ok(true)
    }

    async fn get_unprocessed_items(
        &self,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, StoreError> {
        let items: Vec<CandidateItem> = self.items.lock().unwrap().values().cloned().collect();
        Ok(select_candidates(&items, limit))
    }

    async fn get_items(&self, ids: &[String]) -> Result<Vec<CandidateItem>, StoreError> {
        let items = self.items.lock().unwrap();
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn mark_processed(
        &self,
        items: &[CandidateItem],
        topics: &[String],
    ) -> Result<(), StoreError> {
        let mut stored = self.items.lock().unwrap();
        for item in items {
            if let Some(entry) = stored.get_mut(&item.id) {
                entry.processed = true;
                entry.topics = topics.to_vec();
            }
        }
        Ok(())
    }

    async fn save_article(
        &self,
        article: &GeneratedArticle,
        _image: Option<&str>,
        _style: ArticleStyle,
        output_dir: &Path,
    ) -> Result<String, StoreError> {
        let path = output_dir.join(format!("{}.md", article.slug()));
        self.articles.lock().unwrap().push(article.title.clone());
        Ok(path.display().to_string())
    }

    async fn persist_report(&self, report: &Report, html: &str) -> Result<(), StoreError> {
        if self.broken_reports {
            return Err(store_failure());
        }
        assert!(html.contains(&report.id));
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn cleanup_invalid_files(&self) -> Result<Vec<String>, StoreError> {
        Ok(vec!["items/broken.json".to_string()])
    }

    async fn recompute_stats(&self) -> Result<ContentStats, StoreError> {
        let items = self.items.lock().unwrap();
        let processed_items = items.values().filter(|i| i.processed).count();
        Ok(ContentStats {
            total_items: items.len(),
            processed_items,
            unprocessed_items: items.len() - processed_items,
            reports: self.reports.lock().unwrap().len(),
            computed_at: None,
        })
    }
}

/// Analyzer whose n-th call (1-based) fails
#[derive(Default)]
pub struct FakeAnalyzer {
    pub fail_on_call: Option<usize>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ContentAnalyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        items: &[CandidateItem],
        _config: &AnalysisConfig,
    ) -> Result<Analysis, AiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(AiError::Parse(ParseError::NoJson));
        }

        Ok(Analysis {
            topics: vec![
                Topic {
                    title: format!("Topic {call}"),
                    novelty_score: 8.0,
                    impact_score: 7.0,
                    ..Default::default()
                },
                Topic {
                    title: "Minor".to_string(),
                    novelty_score: 2.0,
                    impact_score: 2.0,
                    ..Default::default()
                },
            ],
            articles: items
                .iter()
                .map(|item| AnalyzedArticle {
                    title: item.title.clone(),
                    link: item.link.clone(),
                    value_score: 8.0,
                    reason: String::new(),
                })
                .collect(),
            ..Default::default()
        })
    }
}

pub struct FakeWriter;

#[async_trait]
impl ArticleWriter for FakeWriter {
    async fn generate_article_text(
        &self,
        _analysis: &Analysis,
        topics: &[Topic],
        _high_value: &[AnalyzedArticle],
        _target_word_count: usize,
    ) -> Result<GeneratedArticle, AiError> {
        Ok(GeneratedArticle {
            title: format!("On {}", topics[0].title),
            content: "Body".to_string(),
            image_prompt: "a lighthouse".to_string(),
            ..Default::default()
        })
    }
}

pub struct FailingImages;

#[async_trait]
impl ImageGenerator for FailingImages {
    async fn generate_image(
        &self,
        _prompt: &str,
        _output_dir: &Path,
    ) -> Result<Option<String>, AiError> {
        Err(AiError::Status {
            status: 500,
            body: "unavailable".to_string(),
        })
    }
}

pub fn items(source: &str, count: usize) -> Vec<CandidateItem> {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            CandidateItem::new(
                source,
                format!("{source} item {i}"),
                format!("https://{source}.example.com/{i}"),
                Some(format!("{source}-{i}")),
                Some(start + Duration::hours(i as i64)),
                "content",
            )
        })
        .collect()
}

pub fn config(feeds: &[&str]) -> WorkflowConfig {
    WorkflowConfig {
        feeds: feeds
            .iter()
            .map(|name| FeedSource {
                name: name.to_string(),
                url: format!("https://{name}.example.com/feed"),
                enabled: true,
            })
            .collect(),
        items_per_article: 2,
        ..Default::default()
    }
}

/// Orchestrator over `store` with empty feeds and default AI fakes
pub fn orchestrator(store: MemoryStore) -> Arc<WorkflowOrchestrator> {
    let collaborators = Collaborators {
        fetcher: Arc::new(FakeFetcher::default()),
        store: Arc::new(store),
        analyzer: Arc::new(FakeAnalyzer::default()),
        writer: Arc::new(FakeWriter),
        images: Arc::new(FailingImages),
    };
    Arc::new(WorkflowOrchestrator::new(
        Arc::new(TaskRegistry::new()),
        collaborators,
        "/out",
    ))
}
