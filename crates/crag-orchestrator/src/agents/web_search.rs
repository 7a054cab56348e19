//! Web search agent.
//!
//! Rewrites the query for a search engine, runs one search, and flattens the
//! hits into prompt-ready text. Search failures produce empty text.

use crate::context::{RunContext, keys};
use crate::error::FailureKind;
use crate::model_call::ModelCaller;
use crate::prompts::{TRANSFORM_QUERY_PROMPT, render};
use crate::{Agent, AgentOutput, Outcome, TaskKind};
use async_trait::async_trait;
use crag_abstraction::{LanguageModel, SearchClient, SearchHit};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of search hits requested.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Formats hits as `Title/Description/URL` records separated by `---`.
///
/// Hits with neither a title nor a description are skipped.
pub fn flatten_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .filter(|hit| !hit.title.is_empty() || !hit.description.is_empty())
        .map(|hit| format!("Title: {}\nDescription: {}\nURL: {}\n", hit.title, hit.description, hit.url))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Agent that searches the web for the query.
#[derive(Clone)]
pub struct WebSearchAgent {
    name: String,
    caller: ModelCaller,
    search: Arc<dyn SearchClient>,
    limit: usize,
}

impl WebSearchAgent {
    /// Default agent name.
    pub const NAME: &'static str = "WebSearchAgent";

    /// Creates a web search agent.
    pub fn new(model: Arc<dyn LanguageModel>, search: Arc<dyn SearchClient>) -> Self {
        Self {
            name: Self::NAME.to_string(),
            caller: ModelCaller::new(model),
            search,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Sets the number of hits requested per search.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Rewrites `query` for web search, falling back to `query` itself.
    pub async fn transform_query(&self, query: &str) -> String {
        let prompt = render(TRANSFORM_QUERY_PROMPT, &[("query_str", query)]);
        match self.caller.call(&prompt).await {
            Ok(response) => {
                let rewritten = response.text.trim();
                if rewritten.is_empty() { query.to_string() } else { rewritten.to_string() }
            }
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Query rewrite failed, searching with original query");
                query.to_string()
            }
        }
    }

    /// Runs one search and flattens the hits; any failure yields `""`.
    pub async fn search_text(&self, query: &str) -> String {
        match self.search.search(query, self.limit).await {
            Ok(hits) => {
                debug!(agent = %self.name, provider = %self.search.provider_name(), hits = hits.len(), "Search completed");
                flatten_hits(&hits)
            }
            Err(e) => {
                warn!(
                    agent = %self.name,
                    provider = %self.search.provider_name(),
                    failure = %FailureKind::SearchError,
                    error = %e,
                    "Web search failed, continuing without search results"
                );
                String::new()
            }
        }
    }
}

#[async_trait]
impl Agent for WebSearchAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::WebSearch
    }

    async fn execute(&self, task: &str, context: &RunContext) -> Outcome {
        let query = context.get_str(keys::QUERY).unwrap_or(task);
        let transformed = self.transform_query(query).await;
        debug!(run_id = %context.run_id, agent = %self.name, query_len = transformed.len(), "Searching the web");

        let text = self.search_text(&transformed).await;
        Outcome::success(&self.name, TaskKind::WebSearch, AgentOutput::Text(text))
            .with_extra(keys::TRANSFORMED_QUERY, transformed)
    }
}
