//! Service Module
//!
//! The orchestration core: task tracking, pipeline sequencing, ranking and
//! reporting. Services reach the outside world only through the client and
//! repository traits.

pub mod batch;
pub mod progress;
pub mod ranking;
pub mod registry;
pub mod report;
pub mod workflow;

#[cfg(test)]
pub mod fakes;

// Re-export the orchestrator surface
pub use registry::{RegistryError, TaskEvent, TaskRegistry};
pub use workflow::{Collaborators, WorkflowError, WorkflowOrchestrator};
