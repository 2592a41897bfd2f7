//! Pipeline API Handlers
//!
//! Launch tracked pipelines and run store maintenance.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use gazette_core::dto::cleanup::CleanupSummary;
use gazette_core::dto::task::{RunPipeline, RunPipelineResponse};

use crate::api::error::ApiResult;
use crate::service::WorkflowOrchestrator;

/// POST /pipeline/run
/// Create a task for the pipeline and start it in the background
pub async fn run_pipeline(
    State(orchestrator): State<Arc<WorkflowOrchestrator>>,
    Json(req): Json<RunPipeline>,
) -> ApiResult<(StatusCode, Json<RunPipelineResponse>)> {
    tracing::info!("Launching {} pipeline", req.kind);

    let task_id = orchestrator.create_and_run_pipeline(req.kind, req.options)?;

    Ok((StatusCode::ACCEPTED, Json(RunPipelineResponse { task_id })))
}

/// POST /cleanup
/// Remove unreadable store files and recompute content stats
pub async fn run_cleanup(
    State(orchestrator): State<Arc<WorkflowOrchestrator>>,
) -> ApiResult<Json<CleanupSummary>> {
    tracing::info!("Running cleanup");

    let summary = orchestrator.run_cleanup().await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::service::fakes::{MemoryStore, orchestrator};
    use gazette_core::domain::task::{PipelineKind, PipelineOptions, TaskId};

    #[tokio::test]
    async fn test_run_returns_accepted_with_task_id() {
        let orchestrator = orchestrator(MemoryStore::default());
        let req = RunPipeline {
            kind: PipelineKind::Fetch,
            options: PipelineOptions::default(),
        };

        let (status, Json(response)) = run_pipeline(State(orchestrator.clone()), Json(req))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(response.task_id, TaskId(1));
        assert!(orchestrator.get_task(TaskId(1)).is_some());
    }

    #[tokio::test]
    async fn test_cleanup_cannot_be_launched_as_a_task() {
        let orchestrator = orchestrator(MemoryStore::default());
        let req = RunPipeline {
            kind: PipelineKind::Cleanup,
            options: PipelineOptions::default(),
        };

        let result = run_pipeline(State(orchestrator.clone()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let Json(summary) = run_cleanup(State(orchestrator)).await.unwrap();
        assert_eq!(summary.removed_files.len(), 1);
    }
}
