//! Task DTOs for the orchestrator API

use serde::{Deserialize, Serialize};

use crate::domain::task::{PipelineKind, PipelineOptions, TaskId, TaskStats};

/// Request to create and run a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPipeline {
    pub kind: PipelineKind,
    #[serde(default)]
    pub options: PipelineOptions,
}

/// Response to a pipeline launch; the caller polls the task by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPipelineResponse {
    pub task_id: TaskId,
}

/// Response to a cancellation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub task_id: TaskId,
    /// False when the task was not running (pending or already finished)
    pub cancelled: bool,
}

/// Liveness answer with the registry's current task counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tasks: TaskStats,
}
