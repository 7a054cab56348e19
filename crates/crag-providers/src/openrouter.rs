//! OpenRouter model implementation.
//!
//! OpenRouter speaks the OpenAI Chat Completions API, so this provider also
//! works against any OpenAI-compatible server via [`OpenRouterModel::with_base_url`].
//! The first choice's message object is returned as-is inside a
//! [`ProviderResponse::Completion`]; normalization happens in the orchestrator.

use async_trait::async_trait;
use crag_abstraction::{
    CompletionText, LanguageModel, MessageObject, ModelError, ModelParameters, ProviderResponse,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{debug, error};

/// Default OpenRouter API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenRouter (OpenAI-compatible) model implementation.
#[derive(Debug, Clone)]
pub struct OpenRouterModel {
    /// The model ID (e.g., "openai/gpt-4o-mini").
    model_id: String,
    /// The API key for authentication.
    api_key: Option<String>,
    /// The base URL for the API.
    base_url: String,
    /// Generation parameters sent with every request.
    parameters: ModelParameters,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenRouterModel {
    /// Creates a new `OpenRouterModel` reading the key from `OPENROUTER_API_KEY`.
    ///
    /// # Errors
    /// Returns a `ModelError` if the API key is not found in environment variables.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("OPENROUTER_API_KEY").map_err(|_| {
            ModelError::UnsupportedModelProvider(
                "OPENROUTER_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `OpenRouterModel` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key: Some(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            parameters: ModelParameters::default(),
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Creates a model for a local server that needs no authentication.
    #[must_use]
    pub fn without_auth(model_id: String, base_url: String) -> Self {
        let mut model = Self::with_api_key(model_id, String::new()).with_base_url(base_url);
        model.api_key = None;
        model
    }

    /// Overrides the API base URL (no trailing `/chat/completions`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn map_status_error(status: reqwest::StatusCode, error_text: String) -> ModelError {
        if status.as_u16() == 402 || status.as_u16() == 429 {
            return ModelError::QuotaExceeded {
                provider: "openrouter".to_string(),
                message: Some(error_text),
            };
        }
        ModelError::ModelResponseError(format!("API error ({}): {}", status, error_text))
    }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
    async fn complete(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "OpenRouterModel completing"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = ChatRequest {
            model: &self.model_id,
            messages: vec![ChatRequestMessage { role: "user", content: prompt }],
            temperature: self.parameters.temperature,
            top_p: self.parameters.top_p,
            max_tokens: self.parameters.max_tokens,
            stop: self.parameters.stop_sequences.as_deref(),
        };

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to send request to OpenRouter API");
            ModelError::RequestError(format!("Network error: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "OpenRouter API returned error status");
            return Err(Self::map_status_error(status, error_text));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenRouter API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let message = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .cloned()
            .ok_or_else(|| {
                error!("No message in OpenRouter API response");
                ModelError::ModelResponseError("No content in API response".to_string())
            })?;

        let message: MessageObject = serde_json::from_value(message).map_err(|e| {
            ModelError::SerializationError(format!("Unexpected message shape: {}", e))
        })?;

        Ok(ProviderResponse::Completion { text: CompletionText::Message(message), raw: body })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}
