//! File-system content store
//!
//! Layout under the data directory:
//! - `config.json`: workflow configuration
//! - `items/<key>.json`: one candidate item per file
//! - `reports/<id>.json` and `reports/<id>.html`
//! - `stats.json`: last recomputed content stats
//!
//! Articles are written as Markdown to the output directory given per call.

use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use gazette_core::domain::article::{ArticleStyle, GeneratedArticle};
use gazette_core::domain::config::WorkflowConfig;
use gazette_core::domain::item::{CandidateItem, storage_key};
use gazette_core::domain::report::Report;
use gazette_core::dto::cleanup::ContentStats;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use super::content::{ContentStore, StoreError};

pub struct FsContentStore {
    data_dir: PathBuf,
}

impl FsContentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    fn items_dir(&self) -> PathBuf {
        self.data_dir.join("items")
    }

    fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    fn item_path(&self, id: &str) -> PathBuf {
        self.items_dir().join(format!("{}.json", storage_key(id)))
    }

    /// Every parseable item; unparseable files are left for cleanup
    async fn all_items(&self) -> Result<Vec<CandidateItem>, StoreError> {
        let mut items = Vec::new();
        for path in json_files(&self.items_dir()).await? {
            match read_json::<CandidateItem>(&path).await {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Ignoring unreadable item: {}", e),
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn load_config(&self) -> Result<WorkflowConfig, StoreError> {
        let path = self.config_path();
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No workflow config at {}; using defaults", path.display());
                return Ok(WorkflowConfig::default());
            }
            Err(source) => return Err(io_error(&path, source)),
        };

        serde_json::from_str(&raw).map_err(|e| StoreError::InvalidConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    async fn store_item(&self, item: &CandidateItem) -> Result<bool, StoreError> {
        let path = self.item_path(&item.id);
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))?
        {
            return Ok(false);
        }

        write_json(&path, item).await?;
        Ok(true)
    }

    async fn get_unprocessed_items(&self, limit: usize) -> Result<Vec<CandidateItem>, StoreError> {
        let mut items: Vec<CandidateItem> = self
            .all_items()
            .await?
            .into_iter()
            .filter(|item| !item.processed)
            .collect();

        // Directory order is arbitrary; the id breaks date ties
        items.sort_by(|a, b| match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        items.truncate(limit);
        Ok(items)
    }

    async fn get_items(&self, ids: &[String]) -> Result<Vec<CandidateItem>, StoreError> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.item_path(id);
            match read_json::<CandidateItem>(&path).await {
                Ok(item) => items.push(item),
                Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                    tracing::warn!("Requested item {} is not in the store", id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(items)
    }

    async fn mark_processed(
        &self,
        items: &[CandidateItem],
        topics: &[String],
    ) -> Result<(), StoreError> {
        for item in items {
            let mut updated = item.clone();
            updated.processed = true;
            updated.topics = topics.to_vec();
            write_json(&self.item_path(&item.id), &updated).await?;
        }
        Ok(())
    }

    async fn save_article(
        &self,
        article: &GeneratedArticle,
        image: Option<&str>,
        style: ArticleStyle,
        output_dir: &Path,
    ) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| io_error(output_dir, e))?;

        let date = Utc::now().date_naive();
        let stem = format!("{}-{}", date.format("%Y-%m-%d"), article.slug());

        let mut path = output_dir.join(format!("{}.md", stem));
        let mut suffix = 2;
        while tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))?
        {
            path = output_dir.join(format!("{}-{}.md", stem, suffix));
            suffix += 1;
        }

        let body = format_article(article, image, style, date)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| io_error(&path, e))?;

        tracing::info!("Article saved to {}", path.display());
        Ok(path.display().to_string())
    }

    async fn persist_report(&self, report: &Report, html: &str) -> Result<(), StoreError> {
        let dir = self.reports_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        // Report files are never overwritten
        let json = serde_json::to_vec_pretty(report)?;
        write_new(&dir.join(format!("{}.json", report.id)), &json).await?;
        write_new(&dir.join(format!("{}.html", report.id)), html.as_bytes()).await?;

        tracing::info!("Report {} persisted", report.id);
        Ok(())
    }

    async fn cleanup_invalid_files(&self) -> Result<Vec<String>, StoreError> {
        let mut removed = Vec::new();

        for path in json_files(&self.items_dir()).await? {
            if read_json::<CandidateItem>(&path).await.is_err() {
                remove(&path, &mut removed).await?;
            }
        }

        for path in json_files(&self.reports_dir()).await? {
            if read_json::<Report>(&path).await.is_err() {
                remove(&path, &mut removed).await?;
            }
        }

        if removed.is_empty() {
            tracing::debug!("Cleanup found no invalid files");
        } else {
            tracing::info!("Cleanup removed {} invalid file(s)", removed.len());
        }
        Ok(removed)
    }

    async fn recompute_stats(&self) -> Result<ContentStats, StoreError> {
        let items = self.all_items().await?;
        let processed_items = items.iter().filter(|item| item.processed).count();

        let stats = ContentStats {
            total_items: items.len(),
            processed_items,
            unprocessed_items: items.len() - processed_items,
            reports: json_files(&self.reports_dir()).await?.len(),
            computed_at: Some(Utc::now()),
        };

        write_json(&self.data_dir.join("stats.json"), &stats).await?;
        Ok(stats)
    }
}

/// Renders an article as Markdown
///
/// Front matter values are written as JSON strings, which YAML reads
/// verbatim, so titles with quotes or colons stay intact.
pub fn format_article(
    article: &GeneratedArticle,
    image: Option<&str>,
    style: ArticleStyle,
    date: NaiveDate,
) -> Result<String, StoreError> {
    let mut out = String::new();

    match style {
        ArticleStyle::FrontMatter => {
            out.push_str("---\n");
            out.push_str(&format!("title: {}\n", serde_json::to_string(&article.title)?));
            if !article.description.is_empty() {
                out.push_str(&format!(
                    "description: {}\n",
                    serde_json::to_string(&article.description)?
                ));
            }
            out.push_str(&format!("date: {}\n", date.format("%Y-%m-%d")));
            out.push_str(&format!("tags: {}\n", serde_json::to_string(&article.tags)?));
            if let Some(image) = image {
                out.push_str(&format!("image: {}\n", serde_json::to_string(image)?));
            }
            out.push_str("---\n\n");
        }
        ArticleStyle::Plain => {
            out.push_str(&format!("# {}\n\n", article.title));
            if !article.description.is_empty() {
                out.push_str(&format!("_{}_\n\n", article.description));
            }
            if let Some(image) = image {
                out.push_str(&format!("![{}]({})\n\n", article.title, image));
            }
        }
    }

    out.push_str(article.content.trim());
    out.push('\n');
    Ok(out)
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }
    let raw = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| io_error(path, e))
}

async fn write_new(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| io_error(path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| io_error(path, e))
}

/// `.json` files directly under `dir`; a missing directory is empty
async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn remove(path: &Path, removed: &mut Vec<String>) -> Result<(), StoreError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| io_error(path, e))?;
    tracing::warn!("Removed invalid file {}", path.display());
    removed.push(path.display().to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn item(id: &str, day: Option<u32>) -> CandidateItem {
        CandidateItem::new(
            "blog",
            format!("Item {id}"),
            format!("https://example.com/{id}"),
            Some(id.to_string()),
            day.map(|d| Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap()),
            "body",
        )
    }

    fn article() -> GeneratedArticle {
        GeneratedArticle {
            title: "Rust: \"fearless\" concurrency".to_string(),
            description: "Why it matters".to_string(),
            content: "Body text\n".to_string(),
            tags: vec!["rust".to_string()],
            image_prompt: String::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_config_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());

        let config = store.load_config().await.unwrap();
        assert_eq!(config, WorkflowConfig::default());
    }

    #[tokio::test]
    async fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("config.json"), "{ nope")
            .await
            .unwrap();
        let store = FsContentStore::new(dir.path());

        let result = store.load_config().await;
        assert!(matches!(result, Err(StoreError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_store_item_reports_new_only_once() {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());

        assert!(store.store_item(&item("a", Some(1))).await.unwrap());
        assert!(!store.store_item(&item("a", Some(1))).await.unwrap());
    }

    #[tokio::test]
    async fn test_unprocessed_items_newest_first_and_mark_processed() {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());
        for candidate in [item("old", Some(1)), item("undated", None), item("new", Some(5))] {
            store.store_item(&candidate).await.unwrap();
        }

        let unprocessed = store.get_unprocessed_items(10).await.unwrap();
        let ids: Vec<&str> = unprocessed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);

        store
            .mark_processed(&unprocessed[..1], &["Topic".to_string()])
            .await
            .unwrap();
        let remaining = store.get_unprocessed_items(10).await.unwrap();
        assert_eq!(remaining.len(), 2);

        let fetched = store
            .get_items(&["new".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].processed);
        assert_eq!(fetched[0].topics, vec!["Topic"]);
    }

    #[tokio::test]
    async fn test_save_article_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());
        let out = dir.path().join("articles");

        let first = store
            .save_article(&article(), None, ArticleStyle::FrontMatter, &out)
            .await
            .unwrap();
        let second = store
            .save_article(&article(), None, ArticleStyle::FrontMatter, &out)
            .await
            .unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("-rust-fearless-concurrency.md"));
        assert!(second.ends_with("-rust-fearless-concurrency-2.md"));
    }

    #[test]
    fn test_format_article_front_matter_escapes_values() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let text = format_article(
            &article(),
            Some("images/a.png"),
            ArticleStyle::FrontMatter,
            date,
        )
        .unwrap();

        assert!(text.starts_with("---\ntitle: \"Rust: \\\"fearless\\\" concurrency\"\n"));
        assert!(text.contains("date: 2025-03-04\n"));
        assert!(text.contains("tags: [\"rust\"]\n"));
        assert!(text.contains("image: \"images/a.png\"\n"));
        assert!(text.ends_with("---\n\nBody text\n"));
    }

    #[test]
    fn test_format_article_plain() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let text = format_article(&article(), None, ArticleStyle::Plain, date).unwrap();
        assert_eq!(
            text,
            "# Rust: \"fearless\" concurrency\n\n_Why it matters_\n\nBody text\n"
        );
    }

    #[tokio::test]
    async fn test_cleanup_removes_unparseable_files_and_stats_recount() {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());
        store.store_item(&item("a", Some(1))).await.unwrap();
        store.store_item(&item("b", Some(2))).await.unwrap();
        store
            .mark_processed(&[item("b", Some(2))], &[])
            .await
            .unwrap();

        let items_dir = dir.path().join("items");
        tokio::fs::write(items_dir.join("broken.json"), "{ truncated")
            .await
            .unwrap();
        tokio::fs::write(items_dir.join("empty.json"), "").await.unwrap();
        tokio::fs::write(items_dir.join("notes.txt"), "not json").await.unwrap();

        let removed = store.cleanup_invalid_files().await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().any(|p| p.ends_with("broken.json")));
        assert!(removed.iter().any(|p| p.ends_with("empty.json")));
        assert!(items_dir.join("notes.txt").exists());

        let stats = store.recompute_stats().await.unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.processed_items, 1);
        assert_eq!(stats.unprocessed_items, 1);
        assert_eq!(stats.reports, 0);
        assert!(dir.path().join("stats.json").exists());
    }

    #[tokio::test]
    async fn test_reports_started_in_the_same_second_are_all_kept() {
        use crate::service::report::{ReportBuilder, render_html};
        use gazette_core::domain::report::PipelineStats;
        use gazette_core::domain::task::PipelineKind;

        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();

        let stats = PipelineStats::default();
        let full = ReportBuilder::new(PipelineKind::Full, at).skipped("empty", stats);
        let fetch = ReportBuilder::new(PipelineKind::Fetch, at).build(Vec::new(), stats, None);
        let again = ReportBuilder::new(PipelineKind::Fetch, at).build(Vec::new(), stats, None);
        for report in [&full, &fetch, &again] {
            store.persist_report(report, &render_html(report)).await.unwrap();
        }

        let mut entries = tokio::fs::read_dir(dir.path().join("reports")).await.unwrap();
        let mut files = 0;
        while entries.next_entry().await.unwrap().is_some() {
            files += 1;
        }
        assert_eq!(files, 6);
        assert_eq!(store.recompute_stats().await.unwrap().reports, 3);

        // An existing report is never overwritten
        let result = store.persist_report(&fetch, "<html></html>").await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }
}
