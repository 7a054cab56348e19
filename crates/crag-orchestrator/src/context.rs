// Run context
//
// Per-run key/value store shared by the steps of one run. The step currently
// running holds `&mut RunContext`; agents only ever see `&RunContext`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Result, WorkflowError};

/// Well-known context keys.
pub mod keys {
    /// The user query.
    pub const QUERY: &str = "query";
    /// Passages returned by the retriever.
    pub const RETRIEVED: &str = "retrieved";
    /// Passages handed to the relevance grader.
    pub const NODES: &str = "nodes";
    /// Retriever options for this run.
    pub const RETRIEVER_OPTIONS: &str = "retriever_options";
    /// Per-passage relevance verdicts.
    pub const RELEVANCE_VERDICTS: &str = "relevance_verdicts";
    /// Text of the passages judged relevant.
    pub const RELEVANT_TEXT: &str = "relevant_text";
    /// The rewritten web search query.
    pub const TRANSFORMED_QUERY: &str = "transformed_query";
    /// Flattened web search results.
    pub const SEARCH_TEXT: &str = "search_text";
    /// The final answer.
    pub const ANSWER: &str = "answer";
}

/// Key/value store scoped to a single run.
#[derive(Debug)]
pub struct RunContext {
    /// Run identifier
    pub run_id: String,
    /// When the run started
    pub created_at: DateTime<Utc>,
    values: HashMap<String, Value>,
}

impl RunContext {
    /// Creates an empty context with a fresh run id.
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4().to_string())
    }

    /// Creates an empty context with the given run id.
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), created_at: Utc::now(), values: HashMap::new() }
    }

    /// Stores a serializable value under `key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Stores a raw JSON value under `key`.
    pub fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Reads `key` as `T`, returning `None` if it is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|source| WorkflowError::ContextShape { key: key.to_string(), source }),
        }
    }

    /// Reads a key a step cannot do without.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)?.ok_or_else(|| WorkflowError::MissingContext { key: key.to_string() })
    }

    /// Borrows a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Whether `key` has been published.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Published keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crag_abstraction::ScoredPassage;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_context_has_unique_run_id() {
        let a = RunContext::new();
        let b = RunContext::new();
        assert_ne!(a.run_id, b.run_id);
        assert!(a.keys().is_empty());
    }

    #[test]
    fn test_typed_round_trip() {
        let mut ctx = RunContext::new();
        let passages = vec![ScoredPassage::new("p1", "text", 0.5)];
        ctx.set(keys::RETRIEVED, &passages).unwrap();
        ctx.set(keys::QUERY, "What is Python?").unwrap();

        let read: Vec<ScoredPassage> = ctx.require(keys::RETRIEVED).unwrap();
        assert_eq!(read, passages);
        assert_eq!(ctx.get_str(keys::QUERY), Some("What is Python?"));
        assert_eq!(ctx.keys(), vec!["query", "retrieved"]);
    }

    #[test]
    fn test_missing_required_key() {
        let ctx = RunContext::new();
        let err = ctx.require::<String>(keys::QUERY).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingContext { ref key } if key == "query"));
        assert_eq!(ctx.get::<String>(keys::QUERY).unwrap(), None);
    }

    #[test]
    fn test_wrong_shape() {
        let mut ctx = RunContext::new();
        ctx.set_value(keys::RETRIEVED, Value::from(3));
        let err = ctx.get::<Vec<ScoredPassage>>(keys::RETRIEVED).unwrap_err();
        assert!(matches!(err, WorkflowError::ContextShape { .. }));
    }
}
