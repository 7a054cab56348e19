//! Answer agent.
//!
//! Synthesizes the final answer from the relevant passage text and the web
//! search text. With no grounding context at all it answers with a fixed
//! message and never calls the model.

use crate::context::{RunContext, keys};
use crate::error::FailureKind;
use crate::model_call::ModelCaller;
use crate::prompts::{ANSWER_PROMPT, NO_RELEVANT_INFORMATION, render};
use crate::{Agent, AgentOutput, Outcome, TaskKind};
use async_trait::async_trait;
use crag_abstraction::LanguageModel;
use std::sync::Arc;
use tracing::{debug, error};

/// Agent that generates the answer.
#[derive(Debug, Clone)]
pub struct AnswerAgent {
    name: String,
    caller: ModelCaller,
}

impl AnswerAgent {
    /// Default agent name.
    pub const NAME: &'static str = "QueryAgent";

    /// Creates an answer agent backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { name: Self::NAME.to_string(), caller: ModelCaller::new(model) }
    }

    /// Answers `query` from the given grounding texts.
    pub async fn answer(&self, query: &str, relevant_text: &str, search_text: &str) -> Outcome {
        if relevant_text.trim().is_empty() && search_text.trim().is_empty() {
            debug!(agent = %self.name, "No grounding context, skipping model call");
            return Outcome::success(
                &self.name,
                TaskKind::AnswerGeneration,
                AgentOutput::Text(NO_RELEVANT_INFORMATION.to_string()),
            )
            .with_extra("short_circuit", true);
        }

        let context_str = format!("{relevant_text}\n{search_text}");
        let prompt = render(ANSWER_PROMPT, &[("context_str", &context_str), ("query_str", query)]);
        debug!(agent = %self.name, context_len = context_str.len(), "Generating answer");

        match self.caller.call(&prompt).await {
            Ok(response) => {
                debug!(agent = %self.name, answer_len = response.text.len(), "Answer generated");
                Outcome::success(&self.name, TaskKind::AnswerGeneration, AgentOutput::Text(response.text))
                    .with_extra("model", self.caller.model_id())
            }
            Err(e) => {
                error!(agent = %self.name, error = %e, "Answer generation failed");
                Outcome::error(&self.name, TaskKind::AnswerGeneration, format!("Error generating response: {e}"))
                    .with_failure_kind(FailureKind::AnswerError)
            }
        }
    }
}

#[async_trait]
impl Agent for AnswerAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::AnswerGeneration
    }

    async fn execute(&self, task: &str, context: &RunContext) -> Outcome {
        let query = context.get_str(keys::QUERY).unwrap_or(task);
        let relevant_text = context.get_str(keys::RELEVANT_TEXT).unwrap_or_default();
        let search_text = context.get_str(keys::SEARCH_TEXT).unwrap_or_default();
        self.answer(query, relevant_text, search_text).await
    }
}
