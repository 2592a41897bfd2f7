//! Report Builder
//!
//! Turns the outcome of one pipeline run into an immutable [`Report`] and
//! renders the HTML form from that same value, so the two cannot disagree
//! on counts, duration or titles.

use chrono::{DateTime, Utc};
use gazette_core::domain::report::{
    ArticleOutcome, IterationError, PipelineStats, Report, ReportSettings,
};
use gazette_core::domain::task::PipelineKind;
use uuid::Uuid;

pub struct ReportBuilder {
    id: String,
    kind: PipelineKind,
    started_at: DateTime<Utc>,
}

impl ReportBuilder {
    pub fn new(kind: PipelineKind, started_at: DateTime<Utc>) -> Self {
        Self {
            id: report_id(kind, started_at),
            kind,
            started_at,
        }
    }

    /// Builds the report of a run that went through its batch (if any)
    ///
    /// Article-producing runs succeed when at least one article was written;
    /// fetch runs always succeed.
    pub fn build(
        &self,
        results: Vec<Result<ArticleOutcome, IterationError>>,
        stats: PipelineStats,
        settings: Option<ReportSettings>,
    ) -> Report {
        let (articles, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
        let articles: Vec<ArticleOutcome> = articles.into_iter().filter_map(Result::ok).collect();
        let failures: Vec<IterationError> = failures.into_iter().filter_map(Result::err).collect();

        let generated_count = articles.len();
        let success = !self.kind.generates_articles() || generated_count > 0;

        let message = if self.kind.generates_articles() && generated_count == 0 {
            Some("No articles were generated".to_string())
        } else if !failures.is_empty() {
            Some(format!(
                "{} of {} article(s) failed",
                failures.len(),
                failures.len() + generated_count
            ))
        } else {
            None
        };

        self.report(success, message, articles, failures, stats, settings)
    }

    /// Report of a run that stopped early because there was nothing to work on
    pub fn skipped(&self, message: &str, stats: PipelineStats) -> Report {
        self.report(
            false,
            Some(message.to_string()),
            Vec::new(),
            Vec::new(),
            stats,
            None,
        )
    }

    fn report(
        &self,
        success: bool,
        message: Option<String>,
        articles: Vec<ArticleOutcome>,
        failures: Vec<IterationError>,
        stats: PipelineStats,
        settings: Option<ReportSettings>,
    ) -> Report {
        Report {
            id: self.id.clone(),
            kind: self.kind,
            success,
            message,
            start_time: self.started_at,
            duration_ms: (Utc::now() - self.started_at).num_milliseconds(),
            generated_count: articles.len(),
            articles,
            failures,
            stats,
            settings,
        }
    }
}

/// `report-YYYYMMDD-HHMMSS-mmm-<kind>-<8 hex>` of the run start
///
/// The random tail keeps runs of the same kind started in the same
/// millisecond apart.
pub fn report_id(kind: PipelineKind, started_at: DateTime<Utc>) -> String {
    let tail = Uuid::new_v4().simple().to_string();
    format!(
        "report-{}-{}-{}",
        started_at.format("%Y%m%d-%H%M%S-%3f"),
        kind.as_str(),
        &tail[..8]
    )
}

/// Renders a self-contained HTML page for a report
pub fn render_html(report: &Report) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape(&report.id)));
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");

    html.push_str(&format!(
        "<h1>{} pipeline</h1>\n<p class=\"{}\">{}</p>\n",
        escape(report.kind.as_str()),
        if report.success { "ok" } else { "fail" },
        if report.success { "Succeeded" } else { "Did not succeed" }
    ));
    if let Some(message) = &report.message {
        html.push_str(&format!("<p>{}</p>\n", escape(message)));
    }

    html.push_str("<table>\n");
    row(&mut html, "Report", &report.id);
    row(&mut html, "Started", &report.start_time.to_rfc3339());
    row(&mut html, "Duration", &format!("{} ms", report.duration_ms));
    row(&mut html, "Articles generated", &report.generated_count.to_string());
    row(&mut html, "Sources", &report.stats.sources.to_string());
    row(&mut html, "Items fetched", &report.stats.fetched.to_string());
    row(&mut html, "New items", &report.stats.new_items.to_string());
    row(&mut html, "Store failures", &report.stats.store_failures.to_string());
    row(&mut html, "Backlog", &report.stats.backlog.to_string());
    html.push_str("</table>\n");

    if !report.articles.is_empty() {
        html.push_str("<h2>Articles</h2>\n<ol>\n");
        for article in &report.articles {
            html.push_str(&format!(
                "<li><strong>{}</strong><br><code>{}</code>",
                escape(&article.title),
                escape(&article.path)
            ));
            if !article.topics.is_empty() {
                html.push_str(&format!("<br>Topics: {}", escape(&article.topics.join(", "))));
            }
            if let Some(image) = &article.image {
                html.push_str(&format!("<br>Image: <code>{}</code>", escape(image)));
            }
            html.push_str("</li>\n");
        }
        html.push_str("</ol>\n");
    }

    if !report.failures.is_empty() {
        html.push_str("<h2>Failures</h2>\n<ul>\n");
        for failure in &report.failures {
            html.push_str(&format!(
                "<li>Iteration {} ({}): {}</li>\n",
                failure.iteration,
                failure.stage,
                escape(&failure.message)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

const STYLE: &str = "<style>\
body{font-family:sans-serif;max-width:48rem;margin:2rem auto}\
table{border-collapse:collapse}td{padding:.25rem .75rem;border-bottom:1px solid #ddd}\
.ok{color:#1a7f37}.fail{color:#cf222e}\
</style>\n";

fn row(html: &mut String, label: &str, value: &str) {
    html.push_str(&format!(
        "<tr><td>{}</td><td>{}</td></tr>\n",
        escape(label),
        escape(value)
    ));
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gazette_core::domain::report::IterationStage;

    fn outcome(iteration: usize, title: &str) -> ArticleOutcome {
        ArticleOutcome {
            iteration,
            title: title.to_string(),
            path: format!("/out/{iteration}.md"),
            image: None,
            topics: vec!["Topic".to_string()],
            source_items: vec!["a".to_string()],
        }
    }

    #[test]
    fn test_build_counts_successes_and_keeps_failures() {
        let builder = ReportBuilder::new(PipelineKind::Full, Utc::now());
        let report = builder.build(
            vec![
                Ok(outcome(1, "First")),
                Err(IterationError::new(2, IterationStage::Analyze, "bad JSON")),
                Ok(outcome(3, "Third")),
            ],
            PipelineStats::default(),
            None,
        );

        assert!(report.success);
        assert_eq!(report.generated_count, 2);
        assert_eq!(report.articles[1].iteration, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.message.as_deref(), Some("1 of 3 article(s) failed"));
    }

    #[test]
    fn test_generating_run_without_articles_is_unsuccessful() {
        let builder = ReportBuilder::new(PipelineKind::Analyze, Utc::now());
        let report = builder.build(Vec::new(), PipelineStats::default(), None);
        assert!(!report.success);
        assert_eq!(report.generated_count, 0);
    }

    #[test]
    fn test_fetch_run_is_successful_without_articles() {
        let builder = ReportBuilder::new(PipelineKind::Fetch, Utc::now());
        let stats = PipelineStats {
            fetched: 12,
            ..Default::default()
        };
        let report = builder.build(Vec::new(), stats, None);
        assert!(report.success);
        assert_eq!(report.generated_count, 0);
        assert!(report.message.is_none());
    }

    #[test]
    fn test_report_id_from_start_time_and_kind() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let id = report_id(PipelineKind::Fetch, at);
        assert!(id.starts_with("report-20250304-050607-000-fetch-"));
        assert_eq!(id.len(), "report-20250304-050607-000-fetch-".len() + 8);
    }

    #[test]
    fn test_same_start_and_kind_still_get_distinct_ids() {
        let at = Utc::now();
        let a = ReportBuilder::new(PipelineKind::Full, at).skipped("a", PipelineStats::default());
        let b = ReportBuilder::new(PipelineKind::Full, at).skipped("b", PipelineStats::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_html_states_the_same_facts() {
        let builder = ReportBuilder::new(PipelineKind::Full, Utc::now());
        let report = builder.build(
            vec![Ok(outcome(1, "Rust <2024> & you"))],
            PipelineStats::default(),
            None,
        );

        let html = render_html(&report);
        assert!(html.contains(&format!("<title>{}</title>", report.id)));
        assert!(html.contains("Rust &lt;2024&gt; &amp; you"));
        assert!(html.contains("<td>Articles generated</td><td>1</td>"));
        assert!(html.contains(&format!("<td>Duration</td><td>{} ms</td>", report.duration_ms)));
        assert!(!html.contains("<h2>Failures</h2>"));
    }

    #[test]
    fn test_skipped_report() {
        let builder = ReportBuilder::new(PipelineKind::Incremental, Utc::now());
        let report = builder.skipped("Nothing to do", PipelineStats::default());
        assert!(!report.success);
        assert_eq!(report.message.as_deref(), Some("Nothing to do"));
        assert!(report.articles.is_empty());
    }
}
