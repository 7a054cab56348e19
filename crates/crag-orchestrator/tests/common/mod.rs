//! Shared test doubles for pipeline integration tests.
//!
//! The scripted model, stub retriever, and stub search are the same doubles
//! the unit tests use.

#![allow(dead_code)]

#[path = "../../src/test_support.rs"]
mod doubles;

pub use doubles::{ScriptedModel, StubRetriever, StubSearch};

use async_trait::async_trait;
use crag_abstraction::{LanguageModel, ModelError, ProviderResponse};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Model that only serves blocking completions.
pub struct BlockingOnlyModel {
    pub blocking_calls: AtomicUsize,
}

impl BlockingOnlyModel {
    pub fn new() -> Self {
        Self { blocking_calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LanguageModel for BlockingOnlyModel {
    async fn complete(&self, _prompt: &str) -> Result<ProviderResponse, ModelError> {
        Err(ModelError::AsyncUnsupported("synchronous client".to_string()))
    }

    fn complete_blocking(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
        self.blocking_calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("As a grader") {
            Ok(ProviderResponse::text("yes"))
        } else {
            Ok(ProviderResponse::text("blocking answer"))
        }
    }

    fn model_id(&self) -> &str {
        "blocking-only"
    }
}

/// The three passages used by the "What is Python?" scenarios.
pub const PYTHON_PASSAGES: [&str; 3] = [
    "Python is a high-level programming language created by Guido van Rossum.",
    "The ball python is a snake native to West and Central Africa.",
    "Python emphasizes code readability with significant indentation.",
];
