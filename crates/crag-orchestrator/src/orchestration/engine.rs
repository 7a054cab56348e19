// Step engine for event-routed pipelines
//
// The engine holds a single live event per run, looks up the step that
// consumes its kind, runs it, and replaces the event with whatever the step
// returned. The whole run is wrapped in a deadline.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::StepTable;
use super::events::{Event, EventKind, RunEvent};
use crate::context::RunContext;
use crate::error::FailureKind;

/// Configuration for the step engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline for an entire run
    pub run_timeout: Duration,
    /// Maximum number of step dispatches per run
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { run_timeout: Duration::from_secs(300), max_steps: 16 }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Run identifier
    pub run_id: String,
    /// `Done` or `Failed`
    pub terminal: Event,
    /// Kind of every event the run held, in order, ending with the terminal kind
    pub path: Vec<EventKind>,
}

impl RunResult {
    /// Whether the run passed through an event of `kind`.
    pub fn visited(&self, kind: EventKind) -> bool {
        self.path.contains(&kind)
    }

    /// The answer, if the run succeeded.
    pub fn answer(&self) -> Option<&str> {
        match &self.terminal {
            Event::Done { answer } => Some(answer),
            _ => None,
        }
    }
}

/// Engine driving a run through a step table
pub struct StepEngine {
    table: StepTable,
    config: EngineConfig,
    event_tx: Option<broadcast::Sender<RunEvent>>,
}

impl StepEngine {
    /// Create a new step engine
    pub fn new(table: StepTable, config: EngineConfig) -> Self {
        Self { table, config, event_tx: None }
    }

    /// Create engine with default configuration
    pub fn with_defaults(table: StepTable) -> Self {
        Self::new(table, EngineConfig::default())
    }

    /// Set the event sender used to emit run progress.
    pub fn set_event_sender(&mut self, event_tx: Option<broadcast::Sender<RunEvent>>) {
        self.event_tx = event_tx;
    }

    /// The step table this engine routes through.
    pub fn table(&self) -> &StepTable {
        &self.table
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Runs `start` to a terminal event with a fresh context.
    pub async fn run(&self, start: Event) -> RunResult {
        let mut context = RunContext::new();
        self.run_in(start, &mut context).await
    }

    /// Runs `start` to a terminal event using the caller's context.
    ///
    /// On deadline expiry the in-flight step is dropped and the run ends with
    /// `Failed{TimeoutError}`; values published before the deadline remain in
    /// `context`.
    pub async fn run_in(&self, start: Event, context: &mut RunContext) -> RunResult {
        let run_id = context.run_id.clone();
        let mut path = Vec::new();
        debug!(run_id = %run_id, start = %start.kind(), "Run started");

        let terminal = match timeout(self.config.run_timeout, self.drive(start, context, &mut path)).await {
            Ok(terminal) => terminal,
            Err(_) => {
                error!(
                    run_id = %run_id,
                    timeout_secs = self.config.run_timeout.as_secs_f64(),
                    "Run exceeded its deadline"
                );
                let terminal = Event::failed(
                    FailureKind::TimeoutError,
                    format!("Run timed out after {} seconds", self.config.run_timeout.as_secs_f64()),
                );
                path.push(terminal.kind());
                terminal
            }
        };

        if let Event::Failed { kind, message } = &terminal {
            warn!(run_id = %run_id, kind = %kind, message = %message, "Run failed");
        } else {
            debug!(run_id = %run_id, steps = path.len().saturating_sub(1), "Run finished");
        }
        self.emit(RunEvent::RunFinished { run_id: run_id.clone(), terminal: terminal.clone() });

        RunResult { run_id, terminal, path }
    }

    async fn drive(&self, start: Event, context: &mut RunContext, path: &mut Vec<EventKind>) -> Event {
        let mut current = start;
        let mut dispatched = 0;

        loop {
            let kind = current.kind();
            path.push(kind);
            if kind.is_terminal() {
                return current;
            }

            if dispatched >= self.config.max_steps {
                warn!(run_id = %context.run_id, max_steps = self.config.max_steps, "Run reached step limit");
                current = Event::failed(
                    FailureKind::StepLimit,
                    format!("Run exceeded {} steps at '{}' event", self.config.max_steps, kind),
                );
                continue;
            }

            let Some(step) = self.table.get(kind).cloned() else {
                current = Event::failed(FailureKind::Unroutable, format!("No step consumes '{}' event", kind));
                continue;
            };

            dispatched += 1;
            debug!(run_id = %context.run_id, step = step.name(), event = %kind, "Dispatching step");
            self.emit(RunEvent::StepStarted {
                run_id: context.run_id.clone(),
                step: step.name().to_string(),
                event_kind: kind,
            });

            current = step.run(current, context).await;

            debug!(run_id = %context.run_id, step = step.name(), emitted = %current.kind(), "Step finished");
            self.emit(RunEvent::StepFinished {
                run_id: context.run_id.clone(),
                step: step.name().to_string(),
                emitted: current.kind(),
            });
        }
    }
}
