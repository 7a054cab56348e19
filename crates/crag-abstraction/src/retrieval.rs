//! Passage retrieval capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A retrieved chunk of source-document text.
///
/// The score is whatever the retriever reports; the engine treats it as
/// opaque and relies on retriever order instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// Passage identifier.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Reference to the source document, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Retriever-assigned relevance score.
    pub score: f32,
}

impl ScoredPassage {
    /// Creates a passage without a source reference.
    pub fn new(id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self { id: id.into(), text: text.into(), source: None, score }
    }

    /// Sets the source document reference.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Per-run retriever configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverOptions {
    /// Maximum number of passages to return. `None` lets the retriever decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl RetrieverOptions {
    /// Options requesting at most `top_k` passages.
    pub fn with_top_k(top_k: usize) -> Self {
        Self { top_k: Some(top_k) }
    }
}

/// Errors raised by a retriever.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalError {
    /// The backing index or service is unreachable.
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    /// The query cannot be served (empty, too long, malformed).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Any other backend failure.
    #[error("Retriever backend error: {0}")]
    Backend(String),
}

/// A passage retriever.
///
/// Returned passages are ordered best-first; callers preserve that order.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieves passages for `query`.
    ///
    /// # Errors
    /// Returns a `RetrievalError` if the backend fails or the query is rejected.
    async fn retrieve(
        &self,
        query: &str,
        options: &RetrieverOptions,
    ) -> Result<Vec<ScoredPassage>, RetrievalError>;

    /// Returns a short name for logging.
    fn name(&self) -> &str;
}
