//! Web search capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single web search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page description or snippet.
    #[serde(default)]
    pub description: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
}

impl SearchHit {
    /// Creates a search hit.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self { title: title.into(), description: description.into(), url: url.into() }
    }
}

/// Errors raised by a search client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchError {
    /// The request could not be sent or the connection failed.
    #[error("Search transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Search endpoint returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to decode search response: {0}")]
    Decode(String),

    /// The endpoint reported `success: false`.
    #[error("Search was not successful: {0}")]
    Unsuccessful(String),
}

/// A web search client.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Runs one search request returning at most `limit` hits.
    ///
    /// # Errors
    /// Returns a `SearchError` on transport, status, or decoding failures.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Returns the provider name for logging.
    fn provider_name(&self) -> &str;
}
