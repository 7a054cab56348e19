// Workflow facade
//
// Binds capabilities and configuration into a runnable pipeline and exposes
// the query-in, answer-or-typed-failure contract front ends call.

use crag_abstraction::{LanguageModel, Retriever, RetrieverOptions, SearchClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::agents::{AnswerAgent, RelevanceGrader, RetrievalAgent, WebSearchAgent};
use crate::error::{FailureKind, Result, WorkflowError};
use crate::orchestration::config::{PipelineKind, WorkflowConfig};
use crate::orchestration::engine::StepEngine;
use crate::orchestration::events::{Event, RunEvent};
use crate::orchestration::linear::LinearOrchestrator;
use crate::orchestration::StepTable;

/// A question to answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    /// The user query
    pub query_str: Option<String>,
    /// Per-request retriever options
    #[serde(default)]
    pub retriever_kwargs: RetrieverOptions,
}

impl WorkflowRequest {
    /// Request for `query` with default retriever options.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query_str: Some(query.into()), retriever_kwargs: RetrieverOptions::default() }
    }

    /// Sets per-request retriever options.
    #[must_use]
    pub fn with_retriever_options(mut self, options: RetrieverOptions) -> Self {
        self.retriever_kwargs = options;
        self
    }
}

/// A successful answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    /// The answer text
    pub result: String,
}

/// A run that ended without an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RunFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable detail
    pub message: String,
}

enum Pipeline {
    Corrective(StepEngine),
    Linear(LinearOrchestrator),
}

/// A configured answering pipeline.
pub struct Workflow {
    pipeline: Pipeline,
    config: WorkflowConfig,
}

impl Workflow {
    /// Starts building a workflow.
    pub fn builder(config: WorkflowConfig) -> WorkflowBuilder {
        WorkflowBuilder::new(config)
    }

    /// The configuration this workflow was built with.
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Which pipeline answers queries.
    pub fn pipeline_kind(&self) -> PipelineKind {
        match self.pipeline {
            Pipeline::Corrective(_) => PipelineKind::Corrective,
            Pipeline::Linear(_) => PipelineKind::Linear,
        }
    }

    /// The corrective step table, if this workflow runs the corrective pipeline.
    pub fn step_table(&self) -> Option<&StepTable> {
        match &self.pipeline {
            Pipeline::Corrective(engine) => Some(engine.table()),
            Pipeline::Linear(_) => None,
        }
    }

    fn retriever_options(&self, requested: &RetrieverOptions) -> RetrieverOptions {
        RetrieverOptions { top_k: requested.top_k.or(Some(self.config.retriever.top_k)) }
    }

    /// Answers one query.
    ///
    /// # Errors
    /// Returns a [`RunFailure`] when the run ends in a failure event.
    pub async fn invoke(&self, request: WorkflowRequest) -> std::result::Result<WorkflowResponse, RunFailure> {
        let options = self.retriever_options(&request.retriever_kwargs);
        info!(pipeline = %self.pipeline_kind(), "Invoking workflow");

        match &self.pipeline {
            Pipeline::Corrective(engine) => {
                let start = Event::Start { query: request.query_str, retriever: options };
                let result = engine.run(start).await;
                debug!(run_id = %result.run_id, path = ?result.path, "Corrective run finished");
                match result.terminal {
                    Event::Done { answer } => Ok(WorkflowResponse { result: answer }),
                    Event::Failed { kind, message } => Err(RunFailure { kind, message }),
                    other => Err(RunFailure {
                        kind: FailureKind::Unroutable,
                        message: format!("run stopped at non-terminal '{}' event", other.kind()),
                    }),
                }
            }
            Pipeline::Linear(orchestrator) => {
                let query = request.query_str.unwrap_or_default();
                let outcome = orchestrator.run(&query, &options).await;
                if outcome.is_success() {
                    Ok(WorkflowResponse { result: outcome.text().unwrap_or_default().to_string() })
                } else {
                    Err(RunFailure {
                        kind: outcome.failure_kind().unwrap_or(FailureKind::AnswerError),
                        message: outcome.text().unwrap_or_default().to_string(),
                    })
                }
            }
        }
    }
}

/// Wires capabilities and configuration into a [`Workflow`].
pub struct WorkflowBuilder {
    config: WorkflowConfig,
    model: Option<Arc<dyn LanguageModel>>,
    retriever: Option<Arc<dyn Retriever>>,
    search: Option<Arc<dyn SearchClient>>,
    event_tx: Option<broadcast::Sender<RunEvent>>,
}

impl WorkflowBuilder {
    /// Creates a builder over `config`.
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config, model: None, retriever: None, search: None, event_tx: None }
    }

    /// Language model used for grading, query rewriting, and answering.
    #[must_use]
    pub fn model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Passage retriever.
    #[must_use]
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Web search client. Required by the corrective pipeline.
    #[must_use]
    pub fn search(mut self, search: Arc<dyn SearchClient>) -> Self {
        self.search = Some(search);
        self
    }

    /// Progress event sender for the corrective pipeline.
    #[must_use]
    pub fn event_sender(mut self, event_tx: broadcast::Sender<RunEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Builds the workflow.
    ///
    /// # Errors
    /// Fails if the configuration is invalid or a required capability is missing.
    pub fn build(self) -> Result<Workflow> {
        self.config.validate()?;
        let model = self.model.ok_or_else(|| WorkflowError::Config("no language model configured".to_string()))?;
        let retriever =
            self.retriever.ok_or_else(|| WorkflowError::Config("no retriever configured".to_string()))?;

        let retrieval = Arc::new(
            RetrievalAgent::new(retriever).with_options(RetrieverOptions::with_top_k(self.config.retriever.top_k)),
        );
        let answer = Arc::new(AnswerAgent::new(Arc::clone(&model)));

        let pipeline = match self.config.workflow.pipeline {
            PipelineKind::Corrective => {
                let search = self.search.ok_or_else(|| {
                    WorkflowError::Config("the corrective pipeline needs a web search client".to_string())
                })?;
                let table = StepTable::corrective(
                    retrieval,
                    Arc::new(RelevanceGrader::new(Arc::clone(&model))),
                    Arc::new(WebSearchAgent::new(model, search).with_limit(self.config.search.limit)),
                    answer,
                    self.config.workflow.search_when_empty,
                )?;
                let mut engine = StepEngine::new(table, self.config.engine_config());
                engine.set_event_sender(self.event_tx);
                Pipeline::Corrective(engine)
            }
            PipelineKind::Linear => Pipeline::Linear(
                LinearOrchestrator::new(retrieval, answer)
                    .with_top_n(self.config.workflow.linear_top_n)
                    .with_timeout(self.config.run_timeout()),
            ),
        };

        Ok(Workflow { pipeline, config: self.config })
    }
}
