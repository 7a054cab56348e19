//! Capability providers for crag.
//!
//! This crate provides concrete implementations of the capability traits in
//! `crag-abstraction`.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and development, no network
//! - **OpenRouter**: Any OpenAI-compatible chat completions endpoint (API key required)
//! - **Firecrawl**: Web search over HTTP (API key required)
//! - **Keyword**: In-memory lexical retriever over a small document set

pub mod factory;
pub mod firecrawl;
pub mod keyword;
pub mod openrouter;

use async_trait::async_trait;
use crag_abstraction::{LanguageModel, ModelError, ProviderResponse};
use tracing::debug;

pub use factory::{ModelFactory, ModelKind};
pub use firecrawl::FirecrawlClient;
pub use keyword::{Document, KeywordRetriever};
pub use openrouter::OpenRouterModel;

/// A mock implementation of [`LanguageModel`] for testing and demonstration.
///
/// The reply echoes the prompt, so grading prompts (which mention "yes")
/// grade every passage relevant.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }

    fn reply(&self, prompt: &str) -> ProviderResponse {
        ProviderResponse::text(format!("Mock response for: {prompt}\nModel ID: {}", self.id))
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
        debug!(model_id = %self.id, prompt_len = prompt.len(), "MockModel completing");
        Ok(self.reply(prompt))
    }

    fn complete_blocking(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
        debug!(model_id = %self.id, prompt_len = prompt.len(), "MockModel completing (blocking)");
        Ok(self.reply(prompt))
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}
