//! Agent orchestrator for crag.
//!
//! This crate defines the agent trait, the agents that answer a question from
//! retrieved passages, and the two pipelines that drive them: the corrective
//! step engine and the linear orchestrator. [`Workflow`] is the entry point
//! most callers want.

pub mod agents;
pub mod context;
pub mod error;
pub mod model_call;
pub mod normalizer;
pub mod orchestration;
pub mod prompts;
pub mod workflow;

#[cfg(test)]
mod test_support;

use async_trait::async_trait;
use crag_abstraction::ScoredPassage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub use agents::{AnswerAgent, GradingReport, RelevanceGrader, RetrievalAgent, Verdict, WebSearchAgent};
pub use context::RunContext;
pub use error::{FailureKind, Result, WorkflowError};
pub use model_call::ModelCaller;
pub use normalizer::normalize;
pub use orchestration::{
    config::{PipelineKind, WorkflowConfig},
    engine::{EngineConfig, RunResult, StepEngine},
    events::{Event, EventKind, RunEvent},
    linear::LinearOrchestrator,
    Step, StepTable,
};
pub use workflow::{RunFailure, Workflow, WorkflowBuilder, WorkflowRequest, WorkflowResponse};

/// Extra key carrying the failure kind of an error outcome.
pub const FAILURE_KIND_KEY: &str = "failure_kind";

/// The kind of work an agent performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Passage retrieval
    Retrieval,
    /// Per-passage relevance grading
    RelevanceEvaluation,
    /// Query rewriting and web search
    WebSearch,
    /// Final answer synthesis
    AnswerGeneration,
    /// A whole pipeline run
    Orchestration,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Retrieval => "retrieval",
            Self::RelevanceEvaluation => "relevance_evaluation",
            Self::WebSearch => "web_search",
            Self::AnswerGeneration => "answer_generation",
            Self::Orchestration => "orchestration",
        };
        f.write_str(name)
    }
}

/// Whether an agent finished its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The task completed.
    Success,
    /// The task failed; the output holds the error message.
    Error,
}

/// Represents the output produced by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AgentOutput {
    /// Retrieved passages, best first.
    Passages(Vec<ScoredPassage>),
    /// Relevance grading results.
    Graded(GradingReport),
    /// A text response.
    Text(String),
}

/// The result of one agent execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Name of the agent that produced this outcome
    pub agent: String,
    /// The task that was performed
    pub task: TaskKind,
    /// Agent output
    pub output: AgentOutput,
    /// Success or error
    pub status: OutcomeStatus,
    /// Agent-specific details
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl Outcome {
    /// Creates a successful outcome.
    pub fn success(agent: impl Into<String>, task: TaskKind, output: AgentOutput) -> Self {
        Self {
            agent: agent.into(),
            task,
            output,
            status: OutcomeStatus::Success,
            extra: HashMap::new(),
        }
    }

    /// Creates an error outcome whose output is the error message.
    pub fn error(agent: impl Into<String>, task: TaskKind, message: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            task,
            output: AgentOutput::Text(message.into()),
            status: OutcomeStatus::Error,
            extra: HashMap::new(),
        }
    }

    /// Attaches an extra detail.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Attaches the failure kind of an error outcome.
    #[must_use]
    pub fn with_failure_kind(self, kind: FailureKind) -> Self {
        self.with_extra(FAILURE_KIND_KEY, kind.to_string())
    }

    /// Whether the task completed.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// The text output, if this outcome carries text.
    pub fn text(&self) -> Option<&str> {
        match &self.output {
            AgentOutput::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The retrieved passages, if this outcome carries passages.
    pub fn passages(&self) -> Option<&[ScoredPassage]> {
        match &self.output {
            AgentOutput::Passages(passages) => Some(passages),
            _ => None,
        }
    }

    /// The failure kind recorded on an error outcome.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.extra
            .get(FAILURE_KIND_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// A string detail from `extra`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// A trait that defines the interface for a pipeline agent.
///
/// Agents read the run context but never write it; the step that invokes an
/// agent publishes whatever the agent produced. An agent reports failure
/// through [`OutcomeStatus::Error`] rather than an `Err`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent's name.
    fn name(&self) -> &str;

    /// Returns the kind of task this agent performs.
    fn task_kind(&self) -> TaskKind;

    /// Executes the agent.
    ///
    /// # Arguments
    /// * `task` - The task input, usually the user query
    /// * `context` - Values published by earlier steps of this run
    async fn execute(&self, task: &str, context: &RunContext) -> Outcome;
}
