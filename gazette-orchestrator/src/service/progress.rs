//! Progress reporting
//!
//! Pipelines never touch task records directly. They announce each step
//! through a [`ProgressSink`] passed down the call chain and poll it for
//! cancellation between steps.

use std::sync::Arc;

use gazette_core::domain::task::TaskId;

use crate::service::registry::TaskRegistry;

/// Receives `(percent, step, message)` announcements from a running pipeline
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, step: &str, message: &str);

    /// Whether the run has been asked to stop
    fn cancelled(&self) -> bool {
        false
    }
}

/// Sink that discards everything; used for untracked runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _percent: u8, _step: &str, _message: &str) {}
}

/// Sink that forwards into the task registry for one task
#[derive(Clone)]
pub struct RegistryProgress {
    registry: Arc<TaskRegistry>,
    id: TaskId,
}

impl RegistryProgress {
    pub fn new(registry: Arc<TaskRegistry>, id: TaskId) -> Self {
        Self { registry, id }
    }

    pub fn task_id(&self) -> TaskId {
        self.id
    }
}

impl ProgressSink for RegistryProgress {
    fn report(&self, percent: u8, step: &str, message: &str) {
        self.registry
            .update_progress(self.id, i32::from(percent), step, message);
    }

    fn cancelled(&self) -> bool {
        self.registry.is_cancelled(self.id)
    }
}

/// Test sink recording every announcement
#[cfg(test)]
#[derive(Default)]
pub struct SpyProgress {
    pub reports: std::sync::Mutex<Vec<(u8, String, String)>>,
    /// Report as cancelled once this many announcements were made
    pub cancel_after: Option<usize>,
}

#[cfg(test)]
impl SpyProgress {
    pub fn cancelling_after(reports: usize) -> Self {
        Self {
            cancel_after: Some(reports),
            ..Default::default()
        }
    }

    pub fn steps(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(_, step, _)| step.clone())
            .collect()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(percent, _, _)| *percent)
            .collect()
    }
}

#[cfg(test)]
impl ProgressSink for SpyProgress {
    fn report(&self, percent: u8, step: &str, message: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((percent, step.to_string(), message.to_string()));
    }

    fn cancelled(&self) -> bool {
        match self.cancel_after {
            Some(limit) => self.reports.lock().unwrap().len() >= limit,
            None => false,
        }
    }
}
