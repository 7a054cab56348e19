//! Capability abstraction layer for crag.
//!
//! This crate defines the traits and types the orchestration engine consumes:
//! a language model, a passage retriever, and a web search client. The engine
//! never talks to a concrete provider directly; everything it needs crosses one
//! of these seams.

pub mod response;
pub mod retrieval;
pub mod search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use response::{CanonicalResponse, CompletionText, MessageObject, ProviderResponse};
pub use retrieval::{RetrievalError, Retriever, RetrieverOptions, ScoredPassage};
pub use search::{SearchClient, SearchError, SearchHit};

/// Represents an error that can occur when interacting with a language model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// An error occurred during the API request (e.g., network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The model returned an error (e.g., invalid input, rate limiting).
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The model provider is not supported or configured.
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),

    /// The provider cannot serve asynchronous completions.
    ///
    /// This is the only error after which callers switch to
    /// [`LanguageModel::complete_blocking`].
    #[error("Async completion unsupported: {0}")]
    AsyncUnsupported(String),

    /// Provider quota exceeded or rate limit hit (hard stop error).
    #[error("Provider '{provider}' quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// The provider name (e.g., "openrouter").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

impl ModelError {
    /// Returns `true` when the error asks the caller to downgrade to the blocking call.
    pub fn is_async_unsupported(&self) -> bool {
        matches!(self, Self::AsyncUnsupported(_))
    }
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// What sampling temperature to use, between 0 and 2.
    pub temperature: Option<f32>,

    /// Nucleus sampling mass.
    pub top_p: Option<f32>,

    /// The maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sequences where the API will stop generating further tokens.
    pub stop_sequences: Option<Vec<String>>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self { temperature: Some(0.1), top_p: None, max_tokens: Some(1024), stop_sequences: None }
    }
}

/// A text-completion capability.
///
/// Implementations are shared across concurrent runs, so they must be
/// `Send + Sync` and must not mutate themselves per call. The response shape
/// is deliberately loose: callers normalize it before reading any text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes the given prompt.
    ///
    /// # Errors
    /// Returns a `ModelError` if the completion fails. Providers that cannot
    /// serve asynchronous calls return [`ModelError::AsyncUnsupported`].
    async fn complete(&self, prompt: &str) -> Result<ProviderResponse, ModelError>;

    /// Completes the given prompt on the calling thread.
    ///
    /// The default implementation reports that no blocking path exists.
    ///
    /// # Errors
    /// Returns a `ModelError` if the completion fails.
    fn complete_blocking(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
        let _ = prompt;
        Err(ModelError::UnsupportedModelProvider(format!(
            "model '{}' has no blocking completion path",
            self.model_id()
        )))
    }

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}
