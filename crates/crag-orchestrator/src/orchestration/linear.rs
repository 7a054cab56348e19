// Linear orchestrator
//
// Retrieve, keep the top passages, answer. No grading and no web search.

use async_trait::async_trait;
use crag_abstraction::RetrieverOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::context::{RunContext, keys};
use crate::error::{FailureKind, WorkflowError};
use crate::prompts::NO_RELEVANT_DOCUMENTS;
use crate::{Agent, AgentOutput, Outcome, TaskKind};

/// Default number of passages handed to the answer agent.
pub const DEFAULT_TOP_N: usize = 3;

/// Sequential retrieve-then-answer pipeline.
pub struct LinearOrchestrator {
    name: String,
    retrieval: Arc<dyn Agent>,
    answer: Arc<dyn Agent>,
    top_n: usize,
    run_timeout: Duration,
}

impl LinearOrchestrator {
    /// Default agent name.
    pub const NAME: &'static str = "Orchestrator";

    /// Creates an orchestrator over a retrieval agent and an answer agent.
    pub fn new(retrieval: Arc<dyn Agent>, answer: Arc<dyn Agent>) -> Self {
        Self {
            name: Self::NAME.to_string(),
            retrieval,
            answer,
            top_n: DEFAULT_TOP_N,
            run_timeout: Duration::from_secs(300),
        }
    }

    /// Sets how many passages reach the answer agent.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Sets the run deadline.
    #[must_use]
    pub fn with_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    /// Answers `query` in a fresh run context.
    pub async fn run(&self, query: &str, options: &RetrieverOptions) -> Outcome {
        let mut context = RunContext::new();
        self.run_in(query, options, &mut context).await
    }

    /// Answers `query` using the caller's context.
    pub async fn run_in(&self, query: &str, options: &RetrieverOptions, context: &mut RunContext) -> Outcome {
        let run_id = context.run_id.clone();
        match timeout(self.run_timeout, self.drive(query, options, context)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(run_id = %run_id, agent = %self.name, "Run exceeded its deadline");
                self.failure(
                    FailureKind::TimeoutError,
                    format!("Error: run timed out after {} seconds", self.run_timeout.as_secs_f64()),
                )
            }
        }
    }

    fn failure(&self, kind: FailureKind, message: impl Into<String>) -> Outcome {
        Outcome::error(&self.name, TaskKind::Orchestration, message).with_failure_kind(kind)
    }

    fn publish(context: &mut RunContext, relevant_text: &str) -> Result<(), WorkflowError> {
        context.set(keys::RELEVANT_TEXT, relevant_text)?;
        context.set(keys::SEARCH_TEXT, "")
    }

    async fn drive(&self, query: &str, options: &RetrieverOptions, context: &mut RunContext) -> Outcome {
        if query.trim().is_empty() {
            return self.failure(FailureKind::MissingQuery, "No query provided.");
        }
        if let Err(e) = context
            .set(keys::QUERY, query)
            .and_then(|()| context.set(keys::RETRIEVER_OPTIONS, options))
        {
            return self.failure(e.failure_kind(), e.to_string());
        }

        let retrieved = self.retrieval.execute(query, context).await;
        if !retrieved.is_success() {
            let kind = retrieved.failure_kind().unwrap_or(FailureKind::RetrievalError);
            return self.failure(kind, format!("Error: {}", retrieved.text().unwrap_or_default()));
        }
        let passages = match retrieved.output {
            AgentOutput::Passages(passages) => passages,
            _ => {
                return self.failure(
                    FailureKind::UnexpectedOutput,
                    format!("Error: agent '{}' did not return passages", retrieved.agent),
                );
            }
        };

        let relevant_text = if passages.is_empty() {
            NO_RELEVANT_DOCUMENTS.to_string()
        } else {
            passages.iter().take(self.top_n).map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
        };
        debug!(
            run_id = %context.run_id,
            agent = %self.name,
            retrieved = passages.len(),
            used = passages.len().min(self.top_n),
            "Answering from top passages"
        );
        if let Err(e) = context.set(keys::RETRIEVED, &passages) {
            return self.failure(e.failure_kind(), e.to_string());
        }
        if let Err(e) = Self::publish(context, &relevant_text) {
            return self.failure(e.failure_kind(), e.to_string());
        }

        let answered = self.answer.execute(query, context).await;
        if !answered.is_success() {
            let kind = answered.failure_kind().unwrap_or(FailureKind::AnswerError);
            return self.failure(kind, answered.text().unwrap_or_default());
        }
        let answer = match answered.output {
            AgentOutput::Text(answer) => answer,
            _ => {
                return self.failure(
                    FailureKind::UnexpectedOutput,
                    format!("Error: agent '{}' did not return text", answered.agent),
                );
            }
        };
        if let Err(e) = context.set(keys::ANSWER, &answer) {
            return self.failure(e.failure_kind(), e.to_string());
        }

        Outcome::success(&self.name, TaskKind::Orchestration, AgentOutput::Text(answer))
            .with_extra("passages_used", passages.len().min(self.top_n))
    }
}

#[async_trait]
impl Agent for LinearOrchestrator {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::Orchestration
    }

    async fn execute(&self, task: &str, context: &RunContext) -> Outcome {
        let query = context.get_str(keys::QUERY).unwrap_or(task);
        let options = context
            .get::<RetrieverOptions>(keys::RETRIEVER_OPTIONS)
            .ok()
            .flatten()
            .unwrap_or_default();
        self.run(query, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedModel, StubRetriever};
    use crate::{AnswerAgent, RetrievalAgent};
    use crag_abstraction::RetrievalError;
    use pretty_assertions::assert_eq;

    fn orchestrator(model: Arc<ScriptedModel>, retriever: StubRetriever) -> LinearOrchestrator {
        LinearOrchestrator::new(
            Arc::new(RetrievalAgent::new(Arc::new(retriever))),
            Arc::new(AnswerAgent::new(model)),
        )
    }

    #[tokio::test]
    async fn test_uses_top_three_passages() {
        let model = Arc::new(ScriptedModel::new("answer"));
        let linear = orchestrator(model.clone(), StubRetriever::passages(&["one", "two", "three", "four"]));

        let outcome = linear.run("q", &RetrieverOptions::default()).await;
        assert_eq!(outcome.text(), Some("answer"));
        assert_eq!(outcome.agent, "Orchestrator");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1, "grading and web search are skipped");
        assert!(prompts[0].contains("one\ntwo\nthree\n"));
        assert!(!prompts[0].contains("four"));
    }

    #[tokio::test]
    async fn test_no_passages_placeholder() {
        let model = Arc::new(ScriptedModel::new("answer"));
        let linear = orchestrator(model.clone(), StubRetriever::passages(&[]));

        linear.run("q", &RetrieverOptions::default()).await;
        assert!(model.prompts()[0].contains("No relevant documents found."));
    }

    #[tokio::test]
    async fn test_retrieval_error() {
        let retriever = StubRetriever::failing(RetrievalError::Unavailable("offline".to_string()));
        let linear = orchestrator(Arc::new(ScriptedModel::new("a")), retriever);

        let outcome = linear.run("q", &RetrieverOptions::default()).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.text(), Some("Error: Retriever unavailable: offline"));
        assert_eq!(outcome.failure_kind(), Some(FailureKind::RetrievalError));
    }

    #[tokio::test]
    async fn test_non_text_answer_is_unexpected_output() {
        let retrieval: Arc<dyn Agent> = Arc::new(RetrievalAgent::new(Arc::new(StubRetriever::passages(&["x"]))));
        let linear = LinearOrchestrator::new(Arc::clone(&retrieval), retrieval);

        let outcome = linear.run("q", &RetrieverOptions::default()).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.failure_kind(), Some(FailureKind::UnexpectedOutput));
        assert_eq!(outcome.text(), Some("Error: agent 'RetrievalAgent' did not return text"));
    }

    #[tokio::test]
    async fn test_missing_query() {
        let linear = orchestrator(Arc::new(ScriptedModel::new("a")), StubRetriever::passages(&["x"]));
        let outcome = linear.run("", &RetrieverOptions::default()).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::MissingQuery));
    }

    #[tokio::test]
    async fn test_execute_reads_query_from_context() {
        let model = Arc::new(ScriptedModel::new("answer"));
        let linear = orchestrator(model.clone(), StubRetriever::passages(&["x"])).with_top_n(1);
        let mut ctx = RunContext::new();
        ctx.set(keys::QUERY, "What is Python?").unwrap();

        let outcome = linear.execute("ignored", &ctx).await;
        assert!(outcome.is_success());
        assert!(model.prompts()[0].contains("What is Python?"));
    }
}
