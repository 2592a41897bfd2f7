use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod client;
pub mod config;
pub mod repository;
pub mod service;

use client::{HttpFeedFetcher, ImageGenerator, NoImages, OpenAiClient, OpenAiImages};
use config::Settings;
use repository::FsContentStore;
use service::{Collaborators, TaskRegistry, WorkflowOrchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazette_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gazette Orchestrator...");

    let settings = Settings::from_env().context("Failed to load settings")?;
    settings.validate().context("Invalid settings")?;

    tracing::info!("Content store at {}", settings.data_dir.display());

    let orchestrator = Arc::new(build_orchestrator(&settings)?);
    spawn_eviction(&orchestrator, &settings);

    // Build router with all API endpoints
    let app = api::create_router(Arc::clone(&orchestrator));

    tracing::info!("Listening on {}", settings.bind_addr);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// Wires the reference collaborators into an orchestrator
fn build_orchestrator(settings: &Settings) -> anyhow::Result<WorkflowOrchestrator> {
    let fetcher =
        HttpFeedFetcher::new(settings.http_timeout).context("Failed to create feed client")?;

    let ai = Arc::new(
        OpenAiClient::new(
            settings.ai_base_url.clone(),
            settings.ai_api_key.clone(),
            settings.ai_model.clone(),
            settings.http_timeout,
        )
        .context("Failed to create AI client")?,
    );

    let images: Arc<dyn ImageGenerator> = match &settings.image_api_key {
        Some(key) => Arc::new(
            OpenAiImages::new(
                settings.ai_base_url.clone(),
                key.clone(),
                settings.image_model.clone(),
                settings.http_timeout,
            )
            .context("Failed to create image client")?,
        ),
        None => {
            tracing::warn!("No image API key configured; article images will be skipped");
            Arc::new(NoImages)
        }
    };

    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        store: Arc::new(FsContentStore::new(settings.data_dir.clone())),
        analyzer: ai.clone(),
        writer: ai,
        images,
    };

    Ok(WorkflowOrchestrator::new(
        Arc::new(TaskRegistry::new()),
        collaborators,
        settings.output_dir.clone(),
    ))
}

/// Periodically drops finished tasks older than the retention window
fn spawn_eviction(orchestrator: &Arc<WorkflowOrchestrator>, settings: &Settings) {
    let orchestrator = Arc::clone(orchestrator);
    let retention = settings.task_retention;
    let mut interval = tokio::time::interval(settings.eviction_interval());

    tokio::spawn(async move {
        loop {
            interval.tick().await;
            orchestrator.evict_finished(retention);
        }
    });
}
