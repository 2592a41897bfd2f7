//! Health Check API Handler
//!
//! Liveness endpoint that also reports how many tasks the registry holds.

use std::sync::Arc;

use axum::{Json, extract::State};
use gazette_core::dto::task::HealthResponse;

use crate::service::WorkflowOrchestrator;

/// GET /health
/// Orchestrator liveness plus task counts per status
pub async fn health_check(
    State(orchestrator): State<Arc<WorkflowOrchestrator>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        tasks: orchestrator.task_stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fakes::{MemoryStore, orchestrator};
    use gazette_core::domain::task::{PipelineKind, PipelineOptions};

    #[tokio::test]
    async fn test_health_reports_task_counts() {
        let orchestrator = orchestrator(MemoryStore::default());

        let Json(health) = health_check(State(orchestrator.clone())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.tasks.total, 0);

        orchestrator
            .create_and_run_pipeline(PipelineKind::Fetch, PipelineOptions::default())
            .unwrap();
        let Json(health) = health_check(State(orchestrator)).await;
        assert_eq!(health.tasks.total, 1);
    }
}
