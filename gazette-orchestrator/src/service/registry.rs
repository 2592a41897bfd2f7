//! Task Registry
//!
//! In-memory, authoritative store of task records and the only place task
//! status changes. Every method completes synchronously: the task map lock is
//! never held across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use gazette_core::domain::task::{
    PipelineKind, PipelineOptions, Task, TaskId, TaskStats, TaskStatus,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::service::progress::RegistryProgress;

const EVENT_CAPACITY: usize = 256;

/// Registry error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {id} is {status}, expected PENDING")]
    InvalidState { id: TaskId, status: TaskStatus },

    #[error("task {id} failed: {message}")]
    Execution { id: TaskId, message: String },
}

/// Task lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Created { id: TaskId, kind: PipelineKind },
    Started { id: TaskId },
    Progress {
        id: TaskId,
        progress: u8,
        step: String,
        message: String,
    },
    Completed { id: TaskId },
    Failed { id: TaskId, error: String },
    Cancelled { id: TaskId },
}

#[cfg(test)]
impl TaskEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::Created { id, .. }
            | TaskEvent::Started { id }
            | TaskEvent::Progress { id, .. }
            | TaskEvent::Completed { id }
            | TaskEvent::Failed { id, .. }
            | TaskEvent::Cancelled { id } => *id,
        }
    }
}

pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, Task>>,
    next_id: AtomicU64,
    events: broadcast::Sender<TaskEvent>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Registers a new PENDING task and returns its id
    pub fn create_task(&self, kind: PipelineKind, options: PipelineOptions) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Task::new(id, kind, options));

        tracing::debug!("Task {} created ({})", id, kind);
        self.emit(TaskEvent::Created { id, kind });
        id
    }

    /// Runs `executor` as the body of a PENDING task
    ///
    /// The task is IN_PROGRESS while the executor runs and ends COMPLETED or
    /// FAILED from its outcome, unless it was cancelled in the meantime, in
    /// which case CANCELLED is kept. An executor failure is returned to the
    /// caller as [`RegistryError::Execution`]. The executor's future runs on
    /// its own tokio task, so a panic in it fails the task instead of leaving
    /// it IN_PROGRESS.
    pub async fn start_task<F, Fut, E>(
        self: &Arc<Self>,
        id: TaskId,
        executor: F,
    ) -> Result<Value, RegistryError>
    where
        F: FnOnce(RegistryProgress) -> Fut,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        {
            let mut tasks = self.lock();
            let task = tasks.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
            if task.status != TaskStatus::Pending {
                return Err(RegistryError::InvalidState {
                    id,
                    status: task.status,
                });
            }
            task.status = TaskStatus::InProgress;
            task.started_at = Some(Utc::now());
        }

        tracing::info!("Task {} started", id);
        self.emit(TaskEvent::Started { id });

        let body = tokio::spawn(executor(RegistryProgress::new(Arc::clone(self), id)));
        let outcome = match body.await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => {
                tracing::error!("Task {} body aborted: {}", id, e);
                Err(format!("task body aborted: {e}"))
            }
        };

        if let Some(event) = self.finish(id, &outcome) {
            self.emit(event);
        }

        outcome.map_err(|message| RegistryError::Execution { id, message })
    }

    /// Records the executor outcome; returns the event to emit, if any
    fn finish(&self, id: TaskId, outcome: &Result<Value, String>) -> Option<TaskEvent> {
        let mut tasks = self.lock();
        let task = tasks.get_mut(&id)?;

        if task.status != TaskStatus::InProgress {
            tracing::debug!(
                "Task {} finished after it became {}; keeping terminal state",
                id,
                task.status
            );
            return None;
        }

        let now = Utc::now();
        task.completed_at = Some(now);
        task.duration_ms = task.started_at.map(|s| (now - s).num_milliseconds());

        match outcome {
            Ok(value) => {
                task.status = TaskStatus::Completed;
                task.progress = 100;
                task.result = Some(value.clone());
                tracing::info!("Task {} completed in {:?}ms", id, task.duration_ms);
                Some(TaskEvent::Completed { id })
            }
            Err(message) => {
                task.status = TaskStatus::Failed;
                task.error = Some(message.clone());
                tracing::warn!("Task {} failed: {}", id, message);
                Some(TaskEvent::Failed {
                    id,
                    error: message.clone(),
                })
            }
        }
    }

    /// Records progress for an IN_PROGRESS task
    ///
    /// Returns whether the update was applied; calls against tasks in any
    /// other state (including unknown ids) are ignored.
    pub fn update_progress(&self, id: TaskId, percent: i32, step: &str, message: &str) -> bool {
        let progress = percent.clamp(0, 100) as u8;
        {
            let mut tasks = self.lock();
            let Some(task) = tasks.get_mut(&id) else {
                return false;
            };
            if task.status != TaskStatus::InProgress {
                return false;
            }
            task.progress = progress;
            task.upsert_step(step, message);
        }

        tracing::debug!("Task {} [{}%] {}: {}", id, progress, step, message);
        self.emit(TaskEvent::Progress {
            id,
            progress,
            step: step.to_string(),
            message: message.to_string(),
        });
        true
    }

    /// Cancels an IN_PROGRESS task
    ///
    /// Advisory only: the running pipeline notices at its next step boundary
    /// and outstanding collaborator calls keep running. Returns false, with
    /// no state change, for PENDING, terminal or unknown tasks.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        {
            let mut tasks = self.lock();
            let Some(task) = tasks.get_mut(&id) else {
                return false;
            };
            if task.status != TaskStatus::InProgress {
                return false;
            }
            let now = Utc::now();
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(now);
            task.duration_ms = task.started_at.map(|s| (now - s).num_milliseconds());
        }

        tracing::info!("Task {} cancelled", id);
        self.emit(TaskEvent::Cancelled { id });
        true
    }

    pub fn is_cancelled(&self, id: TaskId) -> bool {
        self.lock()
            .get(&id)
            .is_some_and(|task| task.status == TaskStatus::Cancelled)
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        self.lock().get(&id).cloned()
    }

    /// All tasks in id order
    pub fn get_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.lock().values().cloned().collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    pub fn get_stats(&self) -> TaskStats {
        let mut stats = TaskStats::default();
        for task in self.lock().values() {
            stats.record(task.status);
        }
        stats
    }

    /// Subscribes to lifecycle events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Removes terminal tasks that finished more than `older_than` ago
    pub fn evict_finished(&self, older_than: Duration) -> usize {
        let retention = TimeDelta::from_std(older_than).unwrap_or(TimeDelta::MAX);
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };

        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|_, task| {
            !(task.status.is_terminal() && task.completed_at.is_some_and(|at| at < cutoff))
        });
        let evicted = before - tasks.len();

        if evicted > 0 {
            tracing::debug!("Evicted {} finished task(s)", evicted);
        }
        evicted
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Task>> {
        // A panic while holding the lock cannot leave a record half-written
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: TaskEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::progress::ProgressSink;
    use tokio::sync::broadcast::error::TryRecvError;

    fn registry() -> Arc<TaskRegistry> {
        Arc::new(TaskRegistry::new())
    }

    #[test]
    fn test_create_task_is_pending() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Full, PipelineOptions::default());

        let task = registry.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert!(task.started_at.is_none());
    }

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let registry = registry();
        let a = registry.create_task(PipelineKind::Full, PipelineOptions::default());
        let b = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        assert_eq!(a, TaskId(1));
        assert_eq!(b, TaskId(2));

        let ids: Vec<TaskId> = registry.get_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_successful_executor_completes_task() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());

        let value = registry
            .start_task(id, |progress| async move {
                progress.report(45, "fetch", "Fetching");
                Ok::<_, String>(serde_json::json!({"fetched": 3}))
            })
            .await
            .unwrap();
        assert_eq!(value["fetched"], 3);

        let task = registry.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.result, Some(serde_json::json!({"fetched": 3})));
        assert!(task.completed_at.is_some());
        assert!(task.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_failing_executor_fails_task_and_returns_error() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Full, PipelineOptions::default());

        let err = registry
            .start_task(id, |_| async { Err::<Value, _>("config unreadable") })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Execution {
                id,
                message: "config unreadable".to_string()
            }
        );

        let task = registry.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("config unreadable"));
        assert!(task.result.is_none());
    }

    #[tokio::test]
    async fn test_panicking_executor_fails_task() {
        let registry = registry();
        let mut events = registry.subscribe();
        let id = registry.create_task(PipelineKind::Analyze, PipelineOptions::default());

        let err = registry
            .start_task(id, |progress| async move {
                progress.report(50, "generate", "Generating articles");
                if progress.task_id() == id {
                    panic!("capacity overflow");
                }
                Ok::<_, String>(Value::Null)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Execution { .. }));

        let task = registry.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, 50);
        assert!(task.error.unwrap().starts_with("task body aborted"));
        assert!(task.completed_at.is_some());

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(TaskEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_start_task_twice_is_invalid_state() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        registry
            .start_task(id, |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap();

        let err = registry
            .start_task(id, |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidState {
                id,
                status: TaskStatus::Completed
            }
        );
    }

    #[tokio::test]
    async fn test_start_unknown_task_is_not_found() {
        let registry = registry();
        let err = registry
            .start_task(TaskId(42), |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound(TaskId(42)));
    }

    #[tokio::test]
    async fn test_progress_outside_in_progress_is_ignored_without_event() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        let mut events = registry.subscribe();

        // Pending
        assert!(!registry.update_progress(id, 50, "fetch", "early"));
        assert_eq!(registry.get_task(id).unwrap().progress, 0);
        assert!(registry.get_task(id).unwrap().steps.is_empty());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        registry
            .start_task(id, |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap();
        while events.try_recv().is_ok() {}

        // Completed
        assert!(!registry.update_progress(id, 10, "late", "stale"));
        let task = registry.get_task(id).unwrap();
        assert_eq!(task.progress, 100);
        assert!(task.steps.is_empty());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_progress_is_clamped_and_steps_upserted() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Full, PipelineOptions::default());
        let inner = Arc::clone(&registry);

        registry
            .start_task(id, move |_| async move {
                assert!(inner.update_progress(id, 150, "fetch", "first"));
                assert_eq!(inner.get_task(id).unwrap().progress, 100);
                assert!(inner.update_progress(id, -5, "fetch", "second"));
                let task = inner.get_task(id).unwrap();
                assert_eq!(task.progress, 0);
                assert_eq!(task.steps.len(), 1);
                assert_eq!(task.steps[0].message, "second");
                Ok::<_, String>(Value::Null)
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_during_run_keeps_cancelled() {
        let registry = registry();
        let id = registry.create_task(PipelineKind::Full, PipelineOptions::default());
        let inner = Arc::clone(&registry);

        let result = registry
            .start_task(id, move |progress| async move {
                assert!(inner.cancel_task(id));
                assert!(progress.cancelled());
                // Late progress from the still-running body is ignored
                progress.report(90, "build-report", "Building report");
                Ok::<_, String>(Value::Null)
            })
            .await;
        assert!(result.is_ok());

        let task = registry.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(task.result.is_none());
        assert!(task.steps.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_pending_or_terminal_is_noop() {
        let registry = registry();
        let pending = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        assert!(!registry.cancel_task(pending));
        assert_eq!(registry.get_task(pending).unwrap().status, TaskStatus::Pending);

        let done = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        registry
            .start_task(done, |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap();
        assert!(!registry.cancel_task(done));
        assert_eq!(registry.get_task(done).unwrap().status, TaskStatus::Completed);

        assert!(!registry.cancel_task(TaskId(99)));
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        let registry = registry();
        let mut events = registry.subscribe();
        let id = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());

        registry
            .start_task(id, |progress| async move {
                progress.report(15, "load-config", "Loading configuration");
                Ok::<_, String>(Value::Null)
            })
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            assert_eq!(event.task_id(), id);
            received.push(event);
        }
        assert!(matches!(received[0], TaskEvent::Created { .. }));
        assert!(matches!(received[1], TaskEvent::Started { .. }));
        assert!(matches!(received[2], TaskEvent::Progress { progress: 15, .. }));
        assert!(matches!(received[3], TaskEvent::Completed { .. }));
        assert_eq!(received.len(), 4);
    }

    #[tokio::test]
    async fn test_stats_count_per_status() {
        let registry = registry();
        registry.create_task(PipelineKind::Full, PipelineOptions::default());
        let ok = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        let bad = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        registry
            .start_task(ok, |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap();
        let _ = registry
            .start_task(bad, |_| async { Err::<Value, _>("boom") })
            .await;

        let stats = registry.get_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.in_progress, 0);
    }

    #[tokio::test]
    async fn test_evict_finished_keeps_recent_and_active_tasks() {
        let registry = registry();
        let pending = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        let done = registry.create_task(PipelineKind::Fetch, PipelineOptions::default());
        registry
            .start_task(done, |_| async { Ok::<_, String>(Value::Null) })
            .await
            .unwrap();

        assert_eq!(registry.evict_finished(Duration::from_secs(3600)), 0);
        assert!(registry.get_task(done).is_some());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.evict_finished(Duration::from_millis(1)), 1);
        assert!(registry.get_task(done).is_none());
        assert!(registry.get_task(pending).is_some());
    }
}
