//! Repository layer
//!
//! Persistence behind the [`ContentStore`] trait. The orchestrator only
//! talks to the trait; the file-system store is the shipped implementation.

mod content;
mod fs;

pub use content::{ContentStore, StoreError};
pub use fs::FsContentStore;
