// Workflow configuration
//
// Pipeline selection, deadlines, retriever defaults, and the model and search
// endpoints. Loaded from TOML, then overridden from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::engine::EngineConfig;
use crate::error::{Result, WorkflowError};

/// Environment variable holding the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Environment variable holding the Firecrawl API key.
pub const FIRECRAWL_API_KEY_ENV: &str = "FIRECRAWL_API_KEY";
/// Environment variable selecting the model.
pub const LLM_MODEL_ENV: &str = "LLM_MODEL";

/// Which pipeline answers a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Retrieve, grade, search when needed, answer
    #[default]
    Corrective,
    /// Retrieve and answer from the top passages
    Linear,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrective => write!(f, "corrective"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for PipelineKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "corrective" => Ok(Self::Corrective),
            "linear" => Ok(Self::Linear),
            other => Err(WorkflowError::Config(format!("unknown pipeline '{other}'"))),
        }
    }
}

/// Workflow configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Pipeline settings
    pub workflow: WorkflowSection,
    /// Retriever defaults
    pub retriever: RetrieverSection,
    /// Language model settings
    pub model: ModelSection,
    /// Web search settings
    pub search: SearchSection,
}

/// `[workflow]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    /// Pipeline to run
    pub pipeline: PipelineKind,
    /// Deadline for a whole run, in seconds
    pub run_timeout_secs: u64,
    /// Maximum step dispatches per run
    pub max_steps: usize,
    /// Passages used by the linear pipeline
    pub linear_top_n: usize,
    /// Search the web when nothing was retrieved
    pub search_when_empty: bool,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            pipeline: PipelineKind::Corrective,
            run_timeout_secs: 300,
            max_steps: 16,
            linear_top_n: 3,
            search_when_empty: false,
        }
    }
}

/// `[retriever]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverSection {
    /// Passages requested per query
    pub top_k: usize,
}

impl Default for RetrieverSection {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// `[model]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Provider kind ("openrouter" or "mock")
    pub provider: String,
    /// Provider model identifier
    pub model_id: String,
    /// Endpoint override
    pub base_url: Option<String>,
    /// API key
    pub api_key: Option<String>,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model_id: "openai/gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// `[search]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Endpoint override
    pub base_url: Option<String>,
    /// API key
    pub api_key: Option<String>,
    /// Hits requested per search
    pub limit: usize,
    /// Server-side search timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self { base_url: None, api_key: None, limit: 5, timeout_ms: 60_000 }
    }
}

impl WorkflowConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific pipeline
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineKind) -> Self {
        self.workflow.pipeline = pipeline;
        self
    }

    /// Set the run deadline in seconds
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.workflow.run_timeout_secs = secs;
        self
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    ///
    /// The document may be bare or nested under a `[crag]` table.
    ///
    /// # Errors
    /// Returns error if the TOML cannot be parsed
    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(toml_content)
            .map_err(|e| WorkflowError::Config(format!("Failed to parse TOML: {}", e)))?;

        let config_value = match value.get("crag") {
            Some(crag) => crag.clone(),
            None => value,
        };

        config_value
            .try_into()
            .map_err(|e: toml::de::Error| WorkflowError::Config(format!("Failed to deserialize config: {}", e)))
    }

    /// Override settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Override settings from `lookup`.
    ///
    /// Set, non-empty variables win over file values. `LLM_MODEL` may carry a
    /// routing prefix such as `openrouter/openai/gpt-4o-mini`; the prefix is
    /// dropped.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup(OPENROUTER_API_KEY_ENV) {
            self.model.api_key = Some(key);
        }
        if let Some(key) = lookup(FIRECRAWL_API_KEY_ENV) {
            self.search.api_key = Some(key);
        }
        if let Some(model) = lookup(LLM_MODEL_ENV) {
            let model = model.trim();
            self.model.model_id = model.strip_prefix("openrouter/").unwrap_or(model).to_string();
        }
    }

    /// Check that limits and deadlines are usable.
    ///
    /// # Errors
    /// Returns `WorkflowError::Config` naming the first bad setting
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.workflow.run_timeout_secs == 0, "workflow.run_timeout_secs must be greater than 0"),
            (self.workflow.max_steps == 0, "workflow.max_steps must be greater than 0"),
            (self.workflow.linear_top_n == 0, "workflow.linear_top_n must be greater than 0"),
            (self.retriever.top_k == 0, "retriever.top_k must be greater than 0"),
            (self.search.limit == 0, "search.limit must be greater than 0"),
            (self.search.timeout_ms == 0, "search.timeout_ms must be greater than 0"),
            (self.model.model_id.trim().is_empty(), "model.model_id must not be empty"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(WorkflowError::Config((*message).to_string())),
            None => Ok(()),
        }
    }

    /// Run deadline as a duration
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.workflow.run_timeout_secs)
    }

    /// Step engine settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig { run_timeout: self.run_timeout(), max_steps: self.workflow.max_steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.workflow.pipeline, PipelineKind::Corrective);
        assert_eq!(config.workflow.run_timeout_secs, 300);
        assert_eq!(config.workflow.max_steps, 16);
        assert_eq!(config.workflow.linear_top_n, 3);
        assert!(!config.workflow.search_when_empty);
        assert_eq!(config.retriever.top_k, 5);
        assert_eq!(config.model.model_id, "openai/gpt-4o-mini");
        assert_eq!(config.search.limit, 5);
        assert_eq!(config.search.timeout_ms, 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorkflowConfig::from_toml_str(
            r#"
            [workflow]
            pipeline = "linear"
            run_timeout_secs = 30

            [model]
            model_id = "anthropic/claude-3.5-haiku"
            "#,
        )
        .unwrap();
        assert_eq!(config.workflow.pipeline, PipelineKind::Linear);
        assert_eq!(config.workflow.run_timeout_secs, 30);
        assert_eq!(config.workflow.max_steps, 16);
        assert_eq!(config.model.model_id, "anthropic/claude-3.5-haiku");
        assert_eq!(config.model.provider, "openrouter");
    }

    #[test]
    fn test_nested_crag_section() {
        let config = WorkflowConfig::from_toml_str(
            r#"
            [crag.search]
            limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.search.limit, 3);
    }

    #[test]
    fn test_invalid_toml() {
        let err = WorkflowConfig::from_toml_str("[workflow\npipeline = ").unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));

        let err = WorkflowConfig::from_toml_str("[workflow]\npipeline = \"circular\"").unwrap_err();
        assert!(err.to_string().contains("Failed to deserialize config"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crag.toml");
        std::fs::write(&path, "[retriever]\ntop_k = 8\n").unwrap();

        let config = WorkflowConfig::load_from_toml(&path).unwrap();
        assert_eq!(config.retriever.top_k, 8);

        assert!(WorkflowConfig::load_from_toml(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENROUTER_API_KEY", "or-key"),
            ("FIRECRAWL_API_KEY", ""),
            ("LLM_MODEL", "openrouter/openai/gpt-4o"),
        ]);
        let mut config = WorkflowConfig::default();
        config.search.api_key = Some("from-file".to_string());

        config.apply_env_from(|name| env.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.model.api_key.as_deref(), Some("or-key"));
        assert_eq!(config.search.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.model.model_id, "openai/gpt-4o");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = WorkflowConfig::default().with_timeout_secs(0);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: workflow.run_timeout_secs must be greater than 0");

        let mut config = WorkflowConfig::default();
        config.search.limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_kind_from_str() {
        assert_eq!("Linear".parse::<PipelineKind>().unwrap(), PipelineKind::Linear);
        assert!("graph".parse::<PipelineKind>().is_err());
        assert_eq!(PipelineKind::Corrective.to_string(), "corrective");
    }

    #[test]
    fn test_engine_config() {
        let config = WorkflowConfig::default().with_timeout_secs(12);
        let engine = config.engine_config();
        assert_eq!(engine.run_timeout, Duration::from_secs(12));
        assert_eq!(engine.max_steps, 16);
    }
}
