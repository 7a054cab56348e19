// Error types for the answering workflow

use std::fmt;

use crag_abstraction::{ModelError, RetrievalError, SearchError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Classification carried by a terminal `Failed` event.
///
/// `GradingError` and `SearchError` are absorbed inside their steps and never
/// end a run; they exist so diagnostics can name what was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The retriever was unavailable or rejected the query.
    RetrievalError,
    /// A per-passage grading call failed.
    GradingError,
    /// The web search request failed.
    SearchError,
    /// The answer model call failed.
    AnswerError,
    /// The run exceeded its deadline.
    TimeoutError,
    /// The run was started without a query.
    MissingQuery,
    /// A step needed a context key no earlier step published.
    MissingContext,
    /// An agent returned an output the step cannot use.
    UnexpectedOutput,
    /// No step consumes the current event.
    Unroutable,
    /// The run dispatched more steps than allowed.
    StepLimit,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RetrievalError => "RetrievalError",
            Self::GradingError => "GradingError",
            Self::SearchError => "SearchError",
            Self::AnswerError => "AnswerError",
            Self::TimeoutError => "TimeoutError",
            Self::MissingQuery => "MissingQuery",
            Self::MissingContext => "MissingContext",
            Self::UnexpectedOutput => "UnexpectedOutput",
            Self::Unroutable => "Unroutable",
            Self::StepLimit => "StepLimit",
        };
        f.write_str(name)
    }
}

/// Workflow errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Retriever failure
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Model error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Web search failure
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    /// A required context key is absent
    #[error("Missing context key '{key}'")]
    MissingContext {
        /// The key that was looked up
        key: String,
    },

    /// A context value could not be read as the requested type
    #[error("Context key '{key}' has an unexpected shape: {source}")]
    ContextShape {
        /// The key that was looked up
        key: String,
        /// Decoding error
        #[source]
        source: serde_json::Error,
    },

    /// The run was started without a query
    #[error("No query provided")]
    MissingQuery,

    /// The step table is inconsistent
    #[error("Invalid step table: {0}")]
    StepTable(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkflowError {
    /// The failure kind a step reports when this error ends it.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Retrieval(_) => FailureKind::RetrievalError,
            Self::Model(_) => FailureKind::AnswerError,
            Self::Search(_) => FailureKind::SearchError,
            Self::MissingQuery => FailureKind::MissingQuery,
            Self::MissingContext { .. } | Self::ContextShape { .. } | Self::Json(_) => {
                FailureKind::MissingContext
            }
            Self::StepTable(_) | Self::Config(_) | Self::Io(_) => FailureKind::Unroutable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::TimeoutError.to_string(), "TimeoutError");
        assert_eq!(FailureKind::RetrievalError.to_string(), "RetrievalError");
        assert_eq!(FailureKind::AnswerError.to_string(), "AnswerError");
    }

    #[test]
    fn test_failure_kind_serde_matches_display() {
        for kind in [FailureKind::SearchError, FailureKind::StepLimit, FailureKind::MissingQuery] {
            let value = serde_json::to_value(kind).unwrap();
            assert_eq!(value, serde_json::Value::String(kind.to_string()));
        }
    }

    #[test]
    fn test_error_to_failure_kind() {
        let err = WorkflowError::from(RetrievalError::Unavailable("down".to_string()));
        assert_eq!(err.failure_kind(), FailureKind::RetrievalError);

        let err = WorkflowError::MissingContext { key: "query".to_string() };
        assert_eq!(err.failure_kind(), FailureKind::MissingContext);
        assert_eq!(err.to_string(), "Missing context key 'query'");
    }
}
