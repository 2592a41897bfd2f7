//! Core domain types
//!
//! This module contains the core domain structures used across Gazette services.
//! These types are shared between the orchestrator (which produces and tracks them)
//! and the CLI (which displays them).

pub mod analysis;
pub mod article;
pub mod config;
pub mod item;
pub mod report;
pub mod task;
