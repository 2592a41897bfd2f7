//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod pipeline;
pub mod task;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::WorkflowOrchestrator;

/// Create the main API router with all endpoints
pub fn create_router(orchestrator: Arc<WorkflowOrchestrator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/run", post(pipeline::run_pipeline))
        .route("/cleanup", post(pipeline::run_cleanup))
        // Task endpoints
        .route("/task/list", get(task::list_tasks))
        .route("/task/stats", get(task::task_stats))
        .route("/task/{id}", get(task::get_task))
        .route("/task/{id}/cancel", post(task::cancel_task))
        // Add state and middleware
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}
