//! Data Transfer Objects
//!
//! Request and response bodies exchanged between the orchestrator API
//! and its clients.

pub mod cleanup;
pub mod task;
