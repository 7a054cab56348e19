//! Model factory for creating model instances from configuration.
//!
//! This module creates language-model capabilities by kind name, handling API
//! key lookup from the environment when none is configured.

use crate::{MockModel, OpenRouterModel};
use crag_abstraction::{LanguageModel, ModelError};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Model kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Mock model for testing.
    Mock,
    /// OpenRouter or any OpenAI-compatible endpoint.
    OpenRouter,
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "openrouter" | "openai-compatible" | "universal" => Ok(Self::OpenRouter),
            other => Err(ModelError::UnsupportedModelProvider(other.to_string())),
        }
    }
}

/// Factory for language-model capabilities.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model of the given kind.
    ///
    /// # Arguments
    /// * `kind` - Which provider to build
    /// * `model_id` - Provider model identifier
    /// * `api_key` - Explicit key; falls back to `OPENROUTER_API_KEY`
    /// * `base_url` - Optional endpoint override
    ///
    /// # Errors
    /// Returns a `ModelError` if an API key is required and cannot be found.
    pub fn create(
        kind: ModelKind,
        model_id: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Arc<dyn LanguageModel>, ModelError> {
        debug!(kind = ?kind, model_id = %model_id, "Creating model");
        match kind {
            ModelKind::Mock => Ok(Arc::new(MockModel::new(model_id))),
            ModelKind::OpenRouter => {
                let model = match api_key {
                    Some(key) => OpenRouterModel::with_api_key(model_id, key),
                    None => OpenRouterModel::new(model_id)?,
                };
                let model = match base_url {
                    Some(url) => model.with_base_url(url),
                    None => model,
                };
                Ok(Arc::new(model))
            }
        }
    }

    /// Creates a model from a kind name such as `"mock"` or `"openrouter"`.
    ///
    /// # Errors
    /// Returns a `ModelError` for unknown kinds or missing credentials.
    pub fn create_from_str(kind: &str, model_id: String) -> Result<Arc<dyn LanguageModel>, ModelError> {
        Self::create(kind.parse()?, model_id, None, None)
    }
}
