//! Client layer
//!
//! Outbound collaborators: feed fetching and the AI provider. Each concern
//! is trait-based so the orchestrator can run against in-memory fakes.

mod ai;
mod feed;
mod openai;

// Re-export traits
pub use ai::{ArticleWriter, ContentAnalyzer, ImageGenerator};
pub use feed::FeedFetcher;

// Re-export errors
pub use ai::AiError;
pub use feed::FeedError;

// Re-export implementations
pub use ai::NoImages;
pub use feed::HttpFeedFetcher;
pub use openai::{OpenAiClient, OpenAiImages};
