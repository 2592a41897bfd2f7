//! API client module
//!
//! HTTP client for the Gazette orchestrator API.

use anyhow::{Context, Result};
use gazette_core::domain::task::{Task, TaskId, TaskStats};
use gazette_core::dto::cleanup::CleanupSummary;
use gazette_core::dto::task::{CancelResponse, RunPipeline, RunPipelineResponse};
use reqwest::Client;

/// HTTP client for the Gazette orchestrator API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Launch a pipeline; returns the id of the task tracking it
    pub async fn run_pipeline(&self, req: &RunPipeline) -> Result<RunPipelineResponse> {
        let url = format!("{}/pipeline/run", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .context("Failed to send run pipeline request")?;

        self.handle_response(response).await
    }

    /// Run store cleanup
    pub async fn cleanup(&self) -> Result<CleanupSummary> {
        let url = format!("{}/cleanup", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send cleanup request")?;

        self.handle_response(response).await
    }

    /// List all tracked tasks
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let url = format!("{}/task/list", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list tasks request")?;

        self.handle_response(response).await
    }

    /// Task counts per status
    pub async fn task_stats(&self) -> Result<TaskStats> {
        let url = format!("{}/task/stats", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send task stats request")?;

        self.handle_response(response).await
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: TaskId) -> Result<Task> {
        let url = format!("{}/task/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get task request")?;

        self.handle_response(response).await
    }

    /// Request cancellation of a task
    pub async fn cancel_task(&self, id: TaskId) -> Result<CancelResponse> {
        let url = format!("{}/task/{}/cancel", self.base_url, id);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send cancel task request")?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize JSON
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}
