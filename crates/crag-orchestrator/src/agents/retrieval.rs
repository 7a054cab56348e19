//! Retrieval agent.
//!
//! Fetches passages for the query from the bound retriever.

use crate::context::{RunContext, keys};
use crate::error::FailureKind;
use crate::{Agent, AgentOutput, Outcome, TaskKind};
use async_trait::async_trait;
use crag_abstraction::{Retriever, RetrieverOptions};
use std::sync::Arc;
use tracing::{debug, error};

/// Agent that retrieves passages for the user query.
#[derive(Clone)]
pub struct RetrievalAgent {
    name: String,
    retriever: Arc<dyn Retriever>,
    options: RetrieverOptions,
}

impl RetrievalAgent {
    /// Default agent name.
    pub const NAME: &'static str = "RetrievalAgent";

    /// Creates a retrieval agent over `retriever`.
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { name: Self::NAME.to_string(), retriever, options: RetrieverOptions::default() }
    }

    /// Sets the options used when the run does not supply its own.
    #[must_use]
    pub fn with_options(mut self, options: RetrieverOptions) -> Self {
        self.options = options;
        self
    }

    fn options_for(&self, context: &RunContext) -> RetrieverOptions {
        let requested: Option<RetrieverOptions> =
            context.get(keys::RETRIEVER_OPTIONS).ok().flatten();
        match requested {
            Some(options) if options.top_k.is_some() => options,
            _ => self.options.clone(),
        }
    }
}

#[async_trait]
impl Agent for RetrievalAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::Retrieval
    }

    async fn execute(&self, task: &str, context: &RunContext) -> Outcome {
        let query = context.get_str(keys::QUERY).unwrap_or(task);
        if query.trim().is_empty() {
            return Outcome::error(&self.name, TaskKind::Retrieval, "No query provided.")
                .with_failure_kind(FailureKind::MissingQuery);
        }

        let options = self.options_for(context);
        debug!(
            run_id = %context.run_id,
            agent = %self.name,
            retriever = %self.retriever.name(),
            top_k = ?options.top_k,
            "Retrieving passages"
        );

        match self.retriever.retrieve(query, &options).await {
            Ok(passages) => {
                debug!(run_id = %context.run_id, agent = %self.name, passages = passages.len(), "Retrieval completed");
                let count = passages.len();
                Outcome::success(&self.name, TaskKind::Retrieval, AgentOutput::Passages(passages))
                    .with_extra("count", count)
            }
            Err(e) => {
                error!(run_id = %context.run_id, agent = %self.name, error = %e, "Retrieval failed");
                Outcome::error(&self.name, TaskKind::Retrieval, e.to_string())
                    .with_failure_kind(FailureKind::RetrievalError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubRetriever;
    use crag_abstraction::RetrievalError;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_returns_passages_in_retriever_order() {
        let agent = RetrievalAgent::new(Arc::new(StubRetriever::passages(&["a", "b", "c"])));
        let outcome = agent.execute("What is Python?", &RunContext::new()).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.agent, "RetrievalAgent");
        assert_eq!(outcome.task, TaskKind::Retrieval);
        let texts: Vec<&str> = outcome.passages().unwrap().iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        let ids: Vec<&str> = outcome.passages().unwrap().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["doc#0", "doc#1", "doc#2"]);
    }

    #[tokio::test]
    async fn test_context_options_override_defaults() {
        let agent = RetrievalAgent::new(Arc::new(StubRetriever::passages(&["a", "b", "c"])))
            .with_options(RetrieverOptions::with_top_k(3));
        let mut ctx = RunContext::new();
        ctx.set(keys::QUERY, "q").unwrap();
        ctx.set(keys::RETRIEVER_OPTIONS, &RetrieverOptions::with_top_k(1)).unwrap();

        let outcome = agent.execute("ignored", &ctx).await;
        assert_eq!(outcome.passages().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retriever_error_becomes_error_outcome() {
        let retriever = StubRetriever::failing(RetrievalError::Unavailable("index offline".to_string()));
        let agent = RetrievalAgent::new(Arc::new(retriever));

        let outcome = agent.execute("q", &RunContext::new()).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.text(), Some("Retriever unavailable: index offline"));
        assert_eq!(outcome.failure_kind(), Some(FailureKind::RetrievalError));
    }

    #[tokio::test]
    async fn test_blank_query() {
        let retriever = Arc::new(StubRetriever::passages(&["a"]));
        let agent = RetrievalAgent::new(retriever.clone());

        let outcome = agent.execute("   ", &RunContext::new()).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::MissingQuery));
        assert_eq!(retriever.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
