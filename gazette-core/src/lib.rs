//! Gazette Core
//!
//! Core types and abstractions for the Gazette article workflow.
//!
//! This crate contains:
//! - Domain types: Core business entities (Task, CandidateItem, Analysis, Report, etc.)
//! - DTOs: Data transfer objects between the orchestrator and its clients
//! - Parsing helpers for structured data embedded in language-model output

pub mod domain;
pub mod dto;
pub mod parse;
