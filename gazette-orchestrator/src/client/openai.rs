//! OpenAI-compatible provider
//!
//! Chat completions back both the analyzer and the writer; the images
//! endpoint backs the optional illustration. Any server speaking the same
//! protocol (local proxies, self-hosted gateways) works via the base URL.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gazette_core::domain::analysis::{Analysis, AnalyzedArticle, Topic};
use gazette_core::domain::article::{GeneratedArticle, slugify};
use gazette_core::domain::config::AnalysisConfig;
use gazette_core::domain::item::CandidateItem;
use reqwest::Client;
use serde_json::{Value, json};

use super::ai::{AiError, ArticleWriter, ContentAnalyzer, ImageGenerator};

/// Chat completions client used for analysis and writing
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        if api_key.is_none() {
            tracing::warn!("AI client created without API key; analysis and writing will fail");
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        })
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_ref().ok_or(AiError::MissingApiKey)?;

        let payload = json!({
            "model": self.model,
            "temperature": 0.7,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        tracing::debug!("[AI] chat request: model={}, prompt={} chars", self.model, user.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        message_content(&body).ok_or(AiError::EmptyResponse)
    }
}

#[async_trait]
impl ContentAnalyzer for OpenAiClient {
    async fn analyze(
        &self,
        items: &[CandidateItem],
        config: &AnalysisConfig,
    ) -> Result<Analysis, AiError> {
        let response = self
            .complete(ANALYST_ROLE, &analysis_prompt(items, config))
            .await?;
        Ok(Analysis::from_response(&response)?)
    }
}

#[async_trait]
impl ArticleWriter for OpenAiClient {
    async fn generate_article_text(
        &self,
        analysis: &Analysis,
        topics: &[Topic],
        high_value: &[AnalyzedArticle],
        target_word_count: usize,
    ) -> Result<GeneratedArticle, AiError> {
        let prompt = article_prompt(analysis, topics, high_value, target_word_count);
        let response = self.complete(WRITER_ROLE, &prompt).await?;
        Ok(GeneratedArticle::from_response(&response)?)
    }
}

/// Images endpoint client; images are downloaded next to the articles
pub struct OpenAiImages {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiImages {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate_image(
        &self,
        prompt: &str,
        output_dir: &Path,
    ) -> Result<Option<String>, AiError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024"
        });

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let Some(url) = body["data"][0]["url"].as_str() else {
            tracing::warn!("Image response carried no URL; skipping image");
            return Ok(None);
        };

        let bytes = self.client.get(url).send().await?.error_for_status()?.bytes().await?;

        let dir = output_dir.join("images");
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!(
            "{}-{}.png",
            Utc::now().format("%Y%m%d-%H%M%S"),
            slugify(prompt).chars().take(40).collect::<String>()
        ));
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!("Image saved to {}", path.display());
        Ok(Some(path.display().to_string()))
    }
}

const ANALYST_ROLE: &str = "You are a technology analyst. You read batches of articles and \
    answer strictly with one JSON object, no prose.";

const WRITER_ROLE: &str = "You are a technical writer producing original long-form articles. \
    You answer strictly with one JSON object, no prose.";

/// First choice message text, if any
fn message_content(body: &Value) -> Option<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn analysis_prompt(items: &[CandidateItem], config: &AnalysisConfig) -> String {
    let mut prompt = format!(
        "Analyze the following {} articles and answer in {}.\n",
        items.len(),
        config.language
    );
    if !config.focus.is_empty() {
        prompt.push_str(&format!("Focus on: {}.\n", config.focus.join(", ")));
    }
    prompt.push_str(
        "Return JSON with keys: topics (array of {title, description, keyPoints, actions, risks, \
         noveltyScore 0-10, impactScore 0-10, relatedArticles}), articles (array of {title, link, \
         valueScore 0-10, reason}), trends, bestPractices, antiPatterns, openQuestions, summary.\n\n",
    );

    for (index, item) in items.iter().enumerate() {
        let excerpt: String = item.content.chars().take(config.max_content_chars).collect();
        prompt.push_str(&format!(
            "[{}] {}\nSource: {}\nLink: {}\n{}\n\n",
            index + 1,
            item.title,
            item.source,
            item.link,
            excerpt
        ));
    }

    prompt
}

fn article_prompt(
    analysis: &Analysis,
    topics: &[Topic],
    high_value: &[AnalyzedArticle],
    target_word_count: usize,
) -> String {
    let mut prompt = format!(
        "Write an original article of about {} words covering the topics below.\n",
        target_word_count
    );
    prompt.push_str(
        "Return JSON with keys: title, description (one sentence), content (Markdown), \
         tags (array), imagePrompt (one sentence describing an illustration).\n\n",
    );

    for topic in topics {
        prompt.push_str(&format!("## {}\n{}\n", topic.title, topic.description));
        for point in &topic.key_points {
            prompt.push_str(&format!("- {}\n", point));
        }
        if !topic.actions.is_empty() {
            prompt.push_str(&format!("Actions: {}\n", topic.actions.join("; ")));
        }
        if !topic.risks.is_empty() {
            prompt.push_str(&format!("Risks: {}\n", topic.risks.join("; ")));
        }
        prompt.push('\n');
    }

    if !high_value.is_empty() {
        prompt.push_str("Cite these sources where relevant:\n");
        for article in high_value {
            prompt.push_str(&format!("- {} ({})\n", article.title, article.link));
        }
        prompt.push('\n');
    }

    if !analysis.trends.is_empty() {
        prompt.push_str(&format!("Context, current trends: {}\n", analysis.trends.join("; ")));
    }
    if !analysis.summary.is_empty() {
        prompt.push_str(&format!("Context, overall summary: {}\n", analysis.summary));
    }

    prompt
}
