//! Run events.
//!
//! [`Event`] is the single live value a run carries from step to step.
//! [`RunEvent`] is the progress stream an engine can broadcast to observers.

use std::fmt;

use crag_abstraction::{RetrieverOptions, ScoredPassage};
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// The event a run currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Initial event carrying the raw user query.
    Start {
        query: Option<String>,
        #[serde(default)]
        retriever: RetrieverOptions,
    },

    /// Passages came back from the retriever.
    Retrieved { passages: Vec<ScoredPassage> },

    /// At least one passage was graded irrelevant.
    NeedsWebSearch { relevant_text: String },

    /// Grounding context is complete.
    ReadyToAnswer { relevant_text: String, search_text: String },

    /// Terminal: the answer.
    Done { answer: String },

    /// Terminal: the run failed.
    Failed { kind: FailureKind, message: String },
}

impl Event {
    /// Start event for `query` with default retriever options.
    pub fn start(query: impl Into<String>) -> Self {
        Self::Start { query: Some(query.into()), retriever: RetrieverOptions::default() }
    }

    /// Terminal failure event.
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed { kind, message: message.into() }
    }

    /// The fieldless discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Retrieved { .. } => EventKind::Retrieved,
            Self::NeedsWebSearch { .. } => EventKind::NeedsWebSearch,
            Self::ReadyToAnswer { .. } => EventKind::ReadyToAnswer,
            Self::Done { .. } => EventKind::Done,
            Self::Failed { .. } => EventKind::Failed,
        }
    }

    /// Whether the run ends at this event.
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }
}

/// Event discriminant, used to route events to steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Retrieved,
    NeedsWebSearch,
    ReadyToAnswer,
    Done,
    Failed,
}

impl EventKind {
    /// Whether events of this kind end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Retrieved => "retrieved",
            Self::NeedsWebSearch => "needs_web_search",
            Self::ReadyToAnswer => "ready_to_answer",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress events broadcast by the step engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A step is about to consume an event.
    StepStarted { run_id: String, step: String, event_kind: EventKind },

    /// A step returned.
    StepFinished { run_id: String, step: String, emitted: EventKind },

    /// The run reached a terminal event.
    RunFinished { run_id: String, terminal: Event },
}
