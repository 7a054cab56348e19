// Test doubles shared by unit and integration tests
//
// Integration tests pull this file in through `tests/common/mod.rs`, so both
// suites see the same reply shapes and passage ids.

#![allow(dead_code)]

use async_trait::async_trait;
use crag_abstraction::{
    LanguageModel, ModelError, ProviderResponse, RetrievalError, Retriever, RetrieverOptions,
    ScoredPassage, SearchClient, SearchError, SearchHit,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Model that replies by matching prompt substrings, first match wins.
///
/// Every prompt is recorded. Unmatched prompts get the fallback as a plain
/// completion.
pub struct ScriptedModel {
    rules: Vec<(String, Result<ProviderResponse, ModelError>)>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(fallback: &str) -> Self {
        Self { rules: Vec::new(), fallback: fallback.to_string(), prompts: Mutex::new(Vec::new()) }
    }

    /// Replies with a chat message object when the prompt contains `needle`.
    pub fn reply(self, needle: &str, reply: &str) -> Self {
        self.respond(needle, ProviderResponse::message(reply))
    }

    /// Replies with an arbitrary provider shape when the prompt contains `needle`.
    pub fn respond(mut self, needle: &str, response: ProviderResponse) -> Self {
        self.rules.push((needle.to_string(), Ok(response)));
        self
    }

    pub fn fail(mut self, needle: &str, error: ModelError) -> Self {
        self.rules.push((needle.to_string(), Err(error)));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts().into_iter().filter(|p| p.contains(needle)).collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<ProviderResponse, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        for (needle, reply) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return reply.clone();
            }
        }
        Ok(ProviderResponse::completion(self.fallback.clone()))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Retriever returning a fixed passage list or a fixed error.
pub struct StubRetriever {
    result: Result<Vec<ScoredPassage>, RetrievalError>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubRetriever {
    /// Passages with ids `doc#0`, `doc#1`, ... and descending scores.
    pub fn passages(texts: &[&str]) -> Self {
        let passages = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ScoredPassage::new(format!("doc#{i}"), *text, 1.0 - i as f32 * 0.1))
            .collect();
        Self { result: Ok(passages), delay: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing(error: RetrievalError) -> Self {
        Self { result: Err(error), delay: None, calls: AtomicUsize::new(0) }
    }

    /// Sleeps before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        options: &RetrieverOptions,
    ) -> Result<Vec<ScoredPassage>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone().map(|mut passages| {
            if let Some(top_k) = options.top_k {
                passages.truncate(top_k);
            }
            passages
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Search client returning fixed hits or a fixed error, recording queries.
pub struct StubSearch {
    result: Result<Vec<SearchHit>, SearchError>,
    queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn hits(hits: Vec<SearchHit>) -> Self {
        Self { result: Ok(hits), queries: Mutex::new(Vec::new()) }
    }

    pub fn failing(error: SearchError) -> Self {
        Self { result: Err(error), queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for StubSearch {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result.clone()
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}
