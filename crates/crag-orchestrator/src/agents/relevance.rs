//! Relevance grading agent.
//!
//! Asks the model for a yes/no verdict on every retrieved passage. Passages
//! are graded concurrently; verdict order always matches passage order. A
//! failed grading call makes that passage "not relevant" and never fails the
//! whole grading.

use crate::context::{RunContext, keys};
use crate::error::FailureKind;
use crate::model_call::ModelCaller;
use crate::prompts::{RELEVANCY_PROMPT, render};
use crate::{Agent, AgentOutput, Outcome, TaskKind};
use async_trait::async_trait;
use crag_abstraction::{LanguageModel, ScoredPassage};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("think block regex should be valid")
});

/// Lowercases and trims a raw verdict and strips `<think>` spans.
pub fn clean_verdict(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    THINK_BLOCK.replace_all(&lowered, "").trim().to_string()
}

/// Whether a cleaned verdict marks the passage relevant.
pub fn is_relevant(cleaned: &str) -> bool {
    cleaned.contains("yes")
}

/// The grading result for one passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Id of the graded passage
    pub passage_id: String,
    /// Model text before cleaning, if the call succeeded
    pub raw: Option<String>,
    /// Cleaned verdict text
    pub cleaned: String,
    /// Whether the passage was judged relevant
    pub relevant: bool,
    /// Error message if the grading call failed
    pub error: Option<String>,
}

/// Grading results for one run, in passage order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    /// Passages judged relevant
    pub relevant: Vec<ScoredPassage>,
    /// One verdict per graded passage
    pub verdicts: Vec<Verdict>,
}

impl GradingReport {
    /// Relevant passage texts joined by newlines.
    pub fn relevant_text(&self) -> String {
        self.relevant.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
    }

    /// Whether any passage was judged not relevant.
    pub fn needs_web_search(&self) -> bool {
        self.verdicts.iter().any(|v| !v.relevant)
    }
}

/// Agent that grades each passage for relevance to the query.
#[derive(Debug, Clone)]
pub struct RelevanceGrader {
    name: String,
    caller: ModelCaller,
}

impl RelevanceGrader {
    /// Default agent name.
    pub const NAME: &'static str = "RelevanceAgent";

    /// Creates a grader backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { name: Self::NAME.to_string(), caller: ModelCaller::new(model) }
    }

    /// Grades every passage against `query`.
    pub async fn grade(&self, query: &str, passages: &[ScoredPassage]) -> GradingReport {
        let calls = passages.iter().map(|passage| self.grade_one(query, passage));
        let verdicts = join_all(calls).await;

        let relevant = passages
            .iter()
            .zip(&verdicts)
            .filter(|(_, verdict)| verdict.relevant)
            .map(|(passage, _)| passage.clone())
            .collect();

        GradingReport { relevant, verdicts }
    }

    async fn grade_one(&self, query: &str, passage: &ScoredPassage) -> Verdict {
        let prompt = render(RELEVANCY_PROMPT, &[("context_str", &passage.text), ("query_str", query)]);
        match self.caller.call(&prompt).await {
            Ok(response) => {
                let cleaned = clean_verdict(&response.text);
                let relevant = is_relevant(&cleaned);
                debug!(agent = %self.name, passage = %passage.id, relevant, "Graded passage");
                Verdict {
                    passage_id: passage.id.clone(),
                    raw: Some(response.text),
                    cleaned,
                    relevant,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    agent = %self.name,
                    passage = %passage.id,
                    failure = %FailureKind::GradingError,
                    error = %e,
                    "Grading call failed, treating passage as not relevant"
                );
                Verdict {
                    passage_id: passage.id.clone(),
                    raw: None,
                    cleaned: String::new(),
                    relevant: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl Agent for RelevanceGrader {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_kind(&self) -> TaskKind {
        TaskKind::RelevanceEvaluation
    }

    async fn execute(&self, task: &str, context: &RunContext) -> Outcome {
        let passages: Vec<ScoredPassage> = match context.get(keys::NODES) {
            Ok(Some(nodes)) => nodes,
            Ok(None) => match context.require(keys::RETRIEVED) {
                Ok(retrieved) => retrieved,
                Err(e) => {
                    return Outcome::error(&self.name, TaskKind::RelevanceEvaluation, e.to_string())
                        .with_failure_kind(e.failure_kind());
                }
            },
            Err(e) => {
                return Outcome::error(&self.name, TaskKind::RelevanceEvaluation, e.to_string())
                    .with_failure_kind(e.failure_kind());
            }
        };
        let query = context.get_str(keys::QUERY).unwrap_or(task);

        debug!(run_id = %context.run_id, agent = %self.name, passages = passages.len(), "Grading passages");
        let report = self.grade(query, &passages).await;
        let relevant = report.relevant.len();
        let failed = report.verdicts.iter().filter(|v| v.error.is_some()).count();
        debug!(run_id = %context.run_id, agent = %self.name, relevant, failed, "Grading completed");

        Outcome::success(&self.name, TaskKind::RelevanceEvaluation, AgentOutput::Graded(report))
            .with_extra("relevant_count", relevant)
            .with_extra("failed_calls", failed)
    }
}
