// Orchestration module - event-routed answering pipelines
//
// A pipeline is a table of steps keyed by the event kind each step consumes.
// The step engine holds one event at a time and hands it to the matching step
// until a terminal event appears.

pub mod config;
pub mod engine;
pub mod events;
pub mod linear;
pub mod steps;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use self::events::{Event, EventKind};
use self::steps::{EvalRelevanceStep, QueryResultStep, RetrieveStep, WebSearchStep};
use crate::context::RunContext;
use crate::error::{Result, WorkflowError};
use crate::Agent;

/// One pipeline stage.
///
/// A step consumes exactly one event kind and returns the next event. Errors
/// are reported as `Event::Failed`, never as panics.
#[async_trait]
pub trait Step: Send + Sync {
    /// Step name used in logs and transition listings.
    fn name(&self) -> &'static str;

    /// The event kind this step consumes.
    fn consumes(&self) -> EventKind;

    /// Runs the step.
    async fn run(&self, event: Event, context: &mut RunContext) -> Event;
}

/// Registry mapping event kinds to the step that consumes them.
#[derive(Clone, Default)]
pub struct StepTable {
    steps: HashMap<EventKind, Arc<dyn Step>>,
    order: Vec<EventKind>,
}

impl StepTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step under the kind it consumes.
    ///
    /// # Errors
    /// Fails if the kind is terminal or already has a step.
    pub fn register(&mut self, step: Arc<dyn Step>) -> Result<()> {
        let kind = step.consumes();
        if kind.is_terminal() {
            return Err(WorkflowError::StepTable(format!(
                "step '{}' cannot consume terminal event '{}'",
                step.name(),
                kind
            )));
        }
        if let Some(existing) = self.steps.get(&kind) {
            return Err(WorkflowError::StepTable(format!(
                "event '{}' is already consumed by step '{}'",
                kind,
                existing.name()
            )));
        }
        self.steps.insert(kind, step);
        self.order.push(kind);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    ///
    /// # Errors
    /// Same as `register`.
    pub fn with_step(mut self, step: Arc<dyn Step>) -> Result<Self> {
        self.register(step)?;
        Ok(self)
    }

    /// The step consuming `kind`, if any.
    pub fn get(&self, kind: EventKind) -> Option<&Arc<dyn Step>> {
        self.steps.get(&kind)
    }

    /// `(event kind, step name)` pairs in registration order.
    pub fn transitions(&self) -> Vec<(EventKind, &'static str)> {
        self.order
            .iter()
            .filter_map(|kind| self.steps.get(kind).map(|step| (*kind, step.name())))
            .collect()
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no step is registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The corrective pipeline: retrieve, grade, search if needed, answer.
    ///
    /// # Errors
    /// Only fails if the built-in steps collide, which they do not.
    pub fn corrective(
        retrieval: Arc<dyn Agent>,
        grader: Arc<dyn Agent>,
        web_search: Arc<dyn Agent>,
        answer: Arc<dyn Agent>,
        search_when_empty: bool,
    ) -> Result<Self> {
        Self::new()
            .with_step(Arc::new(RetrieveStep::new(retrieval)))?
            .with_step(Arc::new(EvalRelevanceStep::new(grader).search_when_empty(search_when_empty)))?
            .with_step(Arc::new(WebSearchStep::new(web_search)))?
            .with_step(Arc::new(QueryResultStep::new(answer)))
    }
}

impl fmt::Debug for StepTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepTable").field("transitions", &self.transitions()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::test_support::{ScriptedModel, StubRetriever, StubSearch};
    use crate::{AnswerAgent, RelevanceGrader, RetrievalAgent, WebSearchAgent};
    use pretty_assertions::assert_eq;

    struct Noop(EventKind);

    #[async_trait]
    impl Step for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn consumes(&self) -> EventKind {
            self.0
        }

        async fn run(&self, _event: Event, _context: &mut RunContext) -> Event {
            Event::failed(FailureKind::Unroutable, "noop")
        }
    }

    fn corrective_table() -> StepTable {
        let model = Arc::new(ScriptedModel::new("yes"));
        StepTable::corrective(
            Arc::new(RetrievalAgent::new(Arc::new(StubRetriever::passages(&["a"])))),
            Arc::new(RelevanceGrader::new(model.clone())),
            Arc::new(WebSearchAgent::new(model.clone(), Arc::new(StubSearch::hits(vec![])))),
            Arc::new(AnswerAgent::new(model)),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_corrective_transitions() {
        assert_eq!(
            corrective_table().transitions(),
            vec![
                (EventKind::Start, "retrieve"),
                (EventKind::Retrieved, "eval_relevance"),
                (EventKind::NeedsWebSearch, "web_search"),
                (EventKind::ReadyToAnswer, "query_result"),
            ]
        );
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut table = StepTable::new();
        table.register(Arc::new(Noop(EventKind::Start))).unwrap();
        let err = table.register(Arc::new(Noop(EventKind::Start))).unwrap_err();
        assert!(matches!(err, WorkflowError::StepTable(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_register_rejects_terminal_kinds() {
        let mut table = StepTable::new();
        assert!(table.register(Arc::new(Noop(EventKind::Done))).is_err());
        assert!(table.register(Arc::new(Noop(EventKind::Failed))).is_err());
        assert!(table.is_empty());
    }
}
