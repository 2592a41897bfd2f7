//! Orchestrator configuration
//!
//! Process-level settings: where to listen, where content lives, and how to
//! reach the AI provider. The per-run workflow configuration (feeds,
//! thresholds, counts) is a separate document loaded by the content store.

use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// Root of the content store (config, items, reports)
    pub data_dir: PathBuf,

    /// Default directory for generated articles
    pub output_dir: PathBuf,

    /// OpenAI-compatible API base URL (e.g., "https://api.openai.com/v1")
    pub ai_base_url: String,

    /// API key for chat completions; analysis and writing fail without it
    pub ai_api_key: Option<String>,

    /// Chat model used for analysis and article writing
    pub ai_model: String,

    /// API key for image generation; images are skipped without it
    pub image_api_key: Option<String>,

    /// Image model
    pub image_model: String,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,

    /// How long finished tasks are kept before eviction
    pub task_retention: Duration,
}

impl Settings {
    /// Creates settings with defaults rooted at `data_dir`
    pub fn new(data_dir: PathBuf) -> Self {
        let output_dir = data_dir.join("articles");
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            data_dir,
            output_dir,
            ai_base_url: "https://api.openai.com/v1".to_string(),
            ai_api_key: None,
            ai_model: "gpt-4o-mini".to_string(),
            image_api_key: None,
            image_model: "dall-e-3".to_string(),
            http_timeout: Duration::from_secs(120),
            task_retention: Duration::from_secs(3600), // 1 hour
        }
    }

    /// Creates settings from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - GAZETTE_BIND_ADDR (default: 0.0.0.0:8080)
    /// - GAZETTE_DATA_DIR (default: ./data)
    /// - GAZETTE_OUTPUT_DIR (default: <data dir>/articles)
    /// - GAZETTE_AI_BASE_URL (default: https://api.openai.com/v1)
    /// - GAZETTE_AI_API_KEY
    /// - GAZETTE_AI_MODEL (default: gpt-4o-mini)
    /// - GAZETTE_IMAGE_API_KEY (falls back to GAZETTE_AI_API_KEY)
    /// - GAZETTE_IMAGE_MODEL (default: dall-e-3)
    /// - GAZETTE_HTTP_TIMEOUT (seconds, default: 120)
    /// - GAZETTE_TASK_RETENTION (seconds, default: 3600)
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("GAZETTE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let mut settings = Self::new(data_dir);

        if let Ok(addr) = std::env::var("GAZETTE_BIND_ADDR") {
            settings.bind_addr = addr;
        }

        if let Ok(dir) = std::env::var("GAZETTE_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }

        if let Ok(url) = std::env::var("GAZETTE_AI_BASE_URL") {
            settings.ai_base_url = url.trim_end_matches('/').to_string();
        }

        settings.ai_api_key = non_empty_var("GAZETTE_AI_API_KEY");

        if let Some(model) = non_empty_var("GAZETTE_AI_MODEL") {
            settings.ai_model = model;
        }

        settings.image_api_key =
            non_empty_var("GAZETTE_IMAGE_API_KEY").or_else(|| settings.ai_api_key.clone());

        if let Some(model) = non_empty_var("GAZETTE_IMAGE_MODEL") {
            settings.image_model = model;
        }

        if let Some(raw) = non_empty_var("GAZETTE_HTTP_TIMEOUT") {
            let secs = raw
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("GAZETTE_HTTP_TIMEOUT must be a number of seconds"))?;
            settings.http_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = non_empty_var("GAZETTE_TASK_RETENTION") {
            let secs = raw.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("GAZETTE_TASK_RETENTION must be a number of seconds")
            })?;
            settings.task_retention = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    /// Validates the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if !self.ai_base_url.starts_with("http://") && !self.ai_base_url.starts_with("https://")
        {
            anyhow::bail!("ai_base_url must start with http:// or https://");
        }

        if self.ai_model.is_empty() {
            anyhow::bail!("ai_model cannot be empty");
        }

        if self.http_timeout.as_secs() == 0 {
            anyhow::bail!("http_timeout must be greater than 0");
        }

        if self.task_retention.as_secs() == 0 {
            anyhow::bail!("task_retention must be greater than 0");
        }

        Ok(())
    }

    /// How often finished tasks are swept
    pub fn eviction_interval(&self) -> Duration {
        self.task_retention.min(Duration::from_secs(60))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
