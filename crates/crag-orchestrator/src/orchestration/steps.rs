// Corrective pipeline steps
//
// Each step wraps one agent. Steps publish to the run context before and
// after the agent call and translate the agent outcome into the next event.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::Step;
use super::events::{Event, EventKind};
use crate::context::{RunContext, keys};
use crate::error::{FailureKind, WorkflowError};
use crate::{Agent, AgentOutput, Outcome};

fn context_failure(error: &WorkflowError) -> Event {
    Event::failed(error.failure_kind(), error.to_string())
}

fn outcome_failure(outcome: &Outcome, default: FailureKind) -> Event {
    Event::failed(
        outcome.failure_kind().unwrap_or(default),
        outcome.text().unwrap_or_default().to_string(),
    )
}

fn unexpected_output(step: &str, agent: &str) -> Event {
    Event::failed(
        FailureKind::UnexpectedOutput,
        format!("step '{}' cannot use output of agent '{}'", step, agent),
    )
}

fn misrouted(step: &str, event: &Event) -> Event {
    Event::failed(
        FailureKind::Unroutable,
        format!("step '{}' received '{}' event", step, event.kind()),
    )
}

/// `Start` -> `Retrieved`.
pub struct RetrieveStep {
    agent: Arc<dyn Agent>,
}

impl RetrieveStep {
    /// Wraps a retrieval agent.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Step for RetrieveStep {
    fn name(&self) -> &'static str {
        "retrieve"
    }

    fn consumes(&self) -> EventKind {
        EventKind::Start
    }

    async fn run(&self, event: Event, context: &mut RunContext) -> Event {
        let (query, retriever) = match event {
            Event::Start { query, retriever } => (query, retriever),
            other => return misrouted(self.name(), &other),
        };
        let query = match query {
            Some(query) if !query.trim().is_empty() => query,
            _ => return Event::failed(FailureKind::MissingQuery, "No query provided."),
        };

        if let Err(e) = context
            .set(keys::QUERY, &query)
            .and_then(|()| context.set(keys::RETRIEVER_OPTIONS, &retriever))
        {
            return context_failure(&e);
        }

        let outcome = self.agent.execute(&query, context).await;
        if !outcome.is_success() {
            return outcome_failure(&outcome, FailureKind::RetrievalError);
        }
        let passages = match outcome.output {
            AgentOutput::Passages(passages) => passages,
            _ => return unexpected_output(self.name(), &outcome.agent),
        };

        if let Err(e) = context.set(keys::RETRIEVED, &passages) {
            return context_failure(&e);
        }
        debug!(run_id = %context.run_id, step = self.name(), passages = passages.len(), "Passages retrieved");
        Event::Retrieved { passages }
    }
}

/// `Retrieved` -> `NeedsWebSearch` or `ReadyToAnswer`.
pub struct EvalRelevanceStep {
    agent: Arc<dyn Agent>,
    search_when_empty: bool,
}

impl EvalRelevanceStep {
    /// Wraps a relevance grader.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent, search_when_empty: false }
    }

    /// Whether a run with no passages goes to web search.
    #[must_use]
    pub fn search_when_empty(mut self, enabled: bool) -> Self {
        self.search_when_empty = enabled;
        self
    }
}

#[async_trait]
impl Step for EvalRelevanceStep {
    fn name(&self) -> &'static str {
        "eval_relevance"
    }

    fn consumes(&self) -> EventKind {
        EventKind::Retrieved
    }

    async fn run(&self, event: Event, context: &mut RunContext) -> Event {
        let passages = match event {
            Event::Retrieved { passages } => passages,
            other => return misrouted(self.name(), &other),
        };

        if passages.is_empty() {
            debug!(run_id = %context.run_id, step = self.name(), "No passages to grade");
            return if self.search_when_empty {
                Event::NeedsWebSearch { relevant_text: String::new() }
            } else {
                Event::ReadyToAnswer { relevant_text: String::new(), search_text: String::new() }
            };
        }

        if let Err(e) = context.set(keys::NODES, &passages) {
            return context_failure(&e);
        }
        let query = context.get_str(keys::QUERY).unwrap_or_default().to_string();

        let outcome = self.agent.execute(&query, context).await;
        if !outcome.is_success() {
            return outcome_failure(&outcome, FailureKind::MissingContext);
        }
        let report = match outcome.output {
            AgentOutput::Graded(report) => report,
            _ => return unexpected_output(self.name(), &outcome.agent),
        };

        let relevant_text = report.relevant_text();
        if let Err(e) = context
            .set(keys::RELEVANCE_VERDICTS, &report.verdicts)
            .and_then(|()| context.set(keys::RELEVANT_TEXT, &relevant_text))
        {
            return context_failure(&e);
        }

        let irrelevant = report.verdicts.iter().filter(|v| !v.relevant).count();
        debug!(
            run_id = %context.run_id,
            step = self.name(),
            relevant = report.relevant.len(),
            irrelevant,
            "Relevance evaluated"
        );

        if report.needs_web_search() {
            Event::NeedsWebSearch { relevant_text }
        } else {
            Event::ReadyToAnswer { relevant_text, search_text: String::new() }
        }
    }
}

/// `NeedsWebSearch` -> `ReadyToAnswer`.
pub struct WebSearchStep {
    agent: Arc<dyn Agent>,
}

impl WebSearchStep {
    /// Wraps a web search agent.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Step for WebSearchStep {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn consumes(&self) -> EventKind {
        EventKind::NeedsWebSearch
    }

    async fn run(&self, event: Event, context: &mut RunContext) -> Event {
        let relevant_text = match event {
            Event::NeedsWebSearch { relevant_text } => relevant_text,
            other => return misrouted(self.name(), &other),
        };
        let query = context.get_str(keys::QUERY).unwrap_or_default().to_string();

        let outcome = self.agent.execute(&query, context).await;
        let search_text = match (outcome.is_success(), outcome.text()) {
            (true, Some(text)) => text.to_string(),
            _ => {
                warn!(
                    run_id = %context.run_id,
                    step = self.name(),
                    failure = %FailureKind::SearchError,
                    "Web search produced no usable output"
                );
                String::new()
            }
        };

        if let Some(transformed) = outcome.extra_str(keys::TRANSFORMED_QUERY) {
            if let Err(e) = context.set(keys::TRANSFORMED_QUERY, transformed) {
                return context_failure(&e);
            }
        }
        if let Err(e) = context.set(keys::SEARCH_TEXT, &search_text) {
            return context_failure(&e);
        }

        debug!(run_id = %context.run_id, step = self.name(), search_len = search_text.len(), "Web search finished");
        Event::ReadyToAnswer { relevant_text, search_text }
    }
}

/// `ReadyToAnswer` -> `Done`.
pub struct QueryResultStep {
    agent: Arc<dyn Agent>,
}

impl QueryResultStep {
    /// Wraps an answer agent.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Step for QueryResultStep {
    fn name(&self) -> &'static str {
        "query_result"
    }

    fn consumes(&self) -> EventKind {
        EventKind::ReadyToAnswer
    }

    async fn run(&self, event: Event, context: &mut RunContext) -> Event {
        let (relevant_text, search_text) = match event {
            Event::ReadyToAnswer { relevant_text, search_text } => (relevant_text, search_text),
            other => return misrouted(self.name(), &other),
        };
        if let Err(e) = context
            .set(keys::RELEVANT_TEXT, &relevant_text)
            .and_then(|()| context.set(keys::SEARCH_TEXT, &search_text))
        {
            return context_failure(&e);
        }
        let query = match context.require::<String>(keys::QUERY) {
            Ok(query) => query,
            Err(e) => return context_failure(&e),
        };

        let outcome = self.agent.execute(&query, context).await;
        if !outcome.is_success() {
            return outcome_failure(&outcome, FailureKind::AnswerError);
        }
        let answer = match outcome.output {
            AgentOutput::Text(answer) => answer,
            _ => return unexpected_output(self.name(), &outcome.agent),
        };

        if let Err(e) = context.set(keys::ANSWER, &answer) {
            return context_failure(&e);
        }
        Event::Done { answer }
    }
}
