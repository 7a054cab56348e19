// Model call wrapper
//
// Every agent talks to its language model through a ModelCaller. The caller
// normalizes responses and performs the one permitted async -> blocking
// downgrade. The wrapped model is shared and never mutated.

use std::fmt;
use std::sync::Arc;

use crag_abstraction::{CanonicalResponse, LanguageModel, ModelError};
use tracing::{debug, warn};

use crate::normalizer::normalize;

/// Normalizing wrapper around one language model.
#[derive(Clone)]
pub struct ModelCaller {
    model: Arc<dyn LanguageModel>,
}

impl ModelCaller {
    /// Wraps a model.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// The wrapped model's identifier.
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Completes `prompt` and normalizes the response.
    ///
    /// If the model reports [`ModelError::AsyncUnsupported`], exactly one
    /// blocking completion is attempted on the blocking thread pool. Any other
    /// error is returned unchanged.
    pub async fn call(&self, prompt: &str) -> Result<CanonicalResponse, ModelError> {
        debug!(model = %self.model.model_id(), prompt_len = prompt.len(), "Calling model");
        match self.model.complete(prompt).await {
            Ok(response) => Ok(normalize(response)),
            Err(e) if e.is_async_unsupported() => {
                warn!(
                    model = %self.model.model_id(),
                    reason = %e,
                    "Async completion unsupported, using blocking call"
                );
                let model = Arc::clone(&self.model);
                let prompt = prompt.to_string();
                let response = tokio::task::spawn_blocking(move || model.complete_blocking(&prompt))
                    .await
                    .map_err(|e| ModelError::Other(format!("blocking completion task failed: {e}")))??;
                Ok(normalize(response))
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for ModelCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCaller").field("model", &self.model.model_id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crag_abstraction::ProviderResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FallbackModel {
        async_error: ModelError,
        blocking_calls: AtomicUsize,
    }

    impl FallbackModel {
        fn new(async_error: ModelError) -> Self {
            Self { async_error, blocking_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl LanguageModel for FallbackModel {
        async fn complete(&self, _prompt: &str) -> Result<ProviderResponse, ModelError> {
            Err(self.async_error.clone())
        }

        fn complete_blocking(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
            self.blocking_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderResponse::message(format!("blocking: {prompt}")))
        }

        fn model_id(&self) -> &str {
            "fallback"
        }
    }

    #[tokio::test]
    async fn test_normalizes_async_response() {
        let caller = ModelCaller::new(Arc::new(crag_providers::MockModel::new("mock".to_string())));
        let response = caller.call("hi").await.unwrap();
        assert!(response.text.starts_with("Mock response for: hi"));
    }

    #[tokio::test]
    async fn test_falls_back_once_on_async_unsupported() {
        let model = Arc::new(FallbackModel::new(ModelError::AsyncUnsupported("sync only".to_string())));
        let caller = ModelCaller::new(model.clone());

        let response = caller.call("prompt").await.unwrap();
        assert_eq!(response.text, "blocking: prompt");
        assert_eq!(model.blocking_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_do_not_fall_back() {
        let model = Arc::new(FallbackModel::new(ModelError::RequestError("connection reset".to_string())));
        let caller = ModelCaller::new(model.clone());

        let err = caller.call("prompt").await.unwrap_err();
        assert_eq!(err, ModelError::RequestError("connection reset".to_string()));
        assert_eq!(model.blocking_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scripted_reply_and_fallback_normalize_alike() {
        let model = crate::test_support::ScriptedModel::new("same text").reply("message", "same text");
        let caller = ModelCaller::new(Arc::new(model));

        assert_eq!(caller.call("a message prompt").await.unwrap().text, "same text");
        assert_eq!(caller.call("anything else").await.unwrap().text, "same text");
    }

    #[tokio::test]
    async fn test_blocking_error_is_returned() {
        struct NoPath;

        #[async_trait]
        impl LanguageModel for NoPath {
            async fn complete(&self, _prompt: &str) -> Result<ProviderResponse, ModelError> {
                Err(ModelError::AsyncUnsupported("no".to_string()))
            }

            fn model_id(&self) -> &str {
                "no-path"
            }
        }

        let err = ModelCaller::new(Arc::new(NoPath)).call("p").await.unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedModelProvider(_)));
    }
}
