//! Task domain types
//!
//! A task is one tracked invocation of a pipeline. Records are owned by the
//! orchestrator's task registry; everything else only reads snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-local task identifier, assigned monotonically starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| format!("invalid task id: '{}'", s))
    }
}

/// Which pipeline a task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Fetch, store, analyze and generate, then report
    Full,
    /// Fetch and store only
    Fetch,
    /// Fetch and store from a caller-chosen subset of feeds
    FetchSelective,
    /// Generate from items that are already stored
    Analyze,
    /// Full run that reuses the unprocessed backlog when it is large enough
    Incremental,
    /// Store maintenance; runs synchronously and is never task-tracked
    Cleanup,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 6] = [
        PipelineKind::Full,
        PipelineKind::Fetch,
        PipelineKind::FetchSelective,
        PipelineKind::Analyze,
        PipelineKind::Incremental,
        PipelineKind::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Full => "full",
            PipelineKind::Fetch => "fetch",
            PipelineKind::FetchSelective => "fetch-selective",
            PipelineKind::Analyze => "analyze",
            PipelineKind::Incremental => "incremental",
            PipelineKind::Cleanup => "cleanup",
        }
    }

    /// Whether runs of this pipeline produce articles
    pub fn generates_articles(&self) -> bool {
        matches!(
            self,
            PipelineKind::Full | PipelineKind::Analyze | PipelineKind::Incremental
        )
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown pipeline '{}' (expected one of: full, fetch, fetch-selective, analyze, incremental, cleanup)",
                    s
                )
            })
    }
}

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::InProgress => write!(f, "IN_PROGRESS"),
            TaskStatus::Completed => write!(f, "COMPLETED"),
            TaskStatus::Failed => write!(f, "FAILED"),
            TaskStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Caller-supplied knobs for one pipeline run
///
/// Every field is optional; unset values fall back to the workflow configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Number of articles to generate
    pub count: Option<usize>,
    /// Explicit candidate items for the first article, by item id
    pub item_ids: Vec<String>,
    /// Feed names to restrict fetching to (fetch-selective)
    pub sources: Vec<String>,
    /// Target word count for generated articles
    pub word_count: Option<usize>,
    /// Override the configured image generation switch
    pub with_image: Option<bool>,
}

/// A named step announced by a running pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Task record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: PipelineKind,
    pub status: TaskStatus,
    pub progress: u8,
    pub steps: Vec<TaskStep>,
    pub options: PipelineOptions,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Task {
    /// Creates a new pending task
    pub fn new(id: TaskId, kind: PipelineKind, options: PipelineOptions) -> Self {
        Self {
            id,
            kind,
            status: TaskStatus::Pending,
            progress: 0,
            steps: Vec::new(),
            options,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            result: None,
            error: None,
        }
    }

    /// Records a step, replacing an existing entry with the same name in place
    pub fn upsert_step(&mut self, name: &str, message: &str) {
        let now = Utc::now();
        match self.steps.iter_mut().find(|step| step.name == name) {
            Some(step) => {
                step.message = message.to_string();
                step.timestamp = now;
            }
            None => self.steps.push(TaskStep {
                name: name.to_string(),
                message: message.to_string(),
                timestamp: now,
            }),
        }
    }

    /// The most recently announced step, if any
    pub fn current_step(&self) -> Option<&TaskStep> {
        self.steps.iter().max_by_key(|step| step.timestamp)
    }
}

/// Task counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl TaskStats {
    pub fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }
}
