//! Firecrawl web search client.
//!
//! One `POST {base_url}/v1/search` per query with bearer auth. Every failure
//! mode maps to a [`SearchError`]; deciding what a failed search means for a
//! run is the caller's business.

use async_trait::async_trait;
use crag_abstraction::{SearchClient, SearchError, SearchHit};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Firecrawl API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Server-side search timeout sent in the request body, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY: usize = 512;

/// Firecrawl search client.
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    api_key: String,
    base_url: String,
    timeout_ms: u64,
    client: Client,
}

impl FirecrawlClient {
    /// Creates a client with an explicit API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            client: Client::builder()
                .timeout(CLIENT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the server-side search timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[async_trait]
impl SearchClient for FirecrawlClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/v1/search", self.base_url);
        debug!(query_len = query.len(), limit, "Firecrawl search");

        let body = SearchRequest { query, limit, timeout: self.timeout_ms };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| SearchError::Transport(e.to_string()))?;

        if !status.is_success() {
            let mut body = text;
            let cut = body.char_indices().nth(MAX_ERROR_BODY).map_or(body.len(), |(i, _)| i);
            body.truncate(cut);
            warn!(status = %status, "Firecrawl returned error status");
            return Err(SearchError::Status { status: status.as_u16(), body });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|e| SearchError::Decode(e.to_string()))?;

        if !parsed.success {
            return Err(SearchError::Unsuccessful(
                parsed.error.unwrap_or_else(|| "no error message".to_string()),
            ));
        }

        let hits: Vec<SearchHit> = parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|item| SearchHit {
                title: item.title.unwrap_or_default(),
                description: item.description.unwrap_or_default(),
                url: item.url.unwrap_or_default(),
            })
            .collect();

        debug!(hits = hits.len(), "Firecrawl search completed");
        Ok(hits)
    }

    fn provider_name(&self) -> &str {
        "firecrawl"
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<SearchItem>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}
