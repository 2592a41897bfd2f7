//! Task API Handlers
//!
//! Read and cancel tracked pipeline tasks.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use gazette_core::domain::task::{Task, TaskId, TaskStats};
use gazette_core::dto::task::CancelResponse;

use crate::api::error::{ApiError, ApiResult};
use crate::service::WorkflowOrchestrator;

/// GET /task/list
/// List all tracked tasks, oldest first
pub async fn list_tasks(State(orchestrator): State<Arc<WorkflowOrchestrator>>) -> Json<Vec<Task>> {
    tracing::debug!("Listing tasks");
    Json(orchestrator.list_tasks())
}

/// GET /task/stats
/// Task counts per status
pub async fn task_stats(State(orchestrator): State<Arc<WorkflowOrchestrator>>) -> Json<TaskStats> {
    Json(orchestrator.task_stats())
}

/// GET /task/{id}
/// Get a task snapshot by ID
pub async fn get_task(
    State(orchestrator): State<Arc<WorkflowOrchestrator>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Task>> {
    tracing::debug!("Getting task: {}", id);

    orchestrator
        .get_task(TaskId(id))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))
}

/// POST /task/{id}/cancel
/// Request cancellation of a running task
///
/// Pending and finished tasks are left alone; the response says whether the
/// request took effect.
pub async fn cancel_task(
    State(orchestrator): State<Arc<WorkflowOrchestrator>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<CancelResponse>> {
    let task_id = TaskId(id);
    if orchestrator.get_task(task_id).is_none() {
        return Err(ApiError::NotFound(format!("Task {} not found", id)));
    }

    let cancelled = orchestrator.cancel_task(task_id);
    tracing::info!("Cancel requested for task {}: cancelled={}", id, cancelled);

    Ok(Json(CancelResponse { task_id, cancelled }))
}
