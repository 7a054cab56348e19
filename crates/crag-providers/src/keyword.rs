//! In-memory keyword retriever.
//!
//! Scores each passage by the share of distinct query terms it contains. This
//! stands in for a vector index in demos and tests; it is not meant to be a
//! good ranker.

use async_trait::async_trait;
use crag_abstraction::{RetrievalError, Retriever, RetrieverOptions, ScoredPassage};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Number of passages returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_K: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "in",
    "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "where",
    "which", "who", "why", "with",
];

/// A passage the retriever can return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Passage identifier.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Source document reference.
    pub source: Option<String>,
}

impl Document {
    /// Creates a document without a source reference.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), source: None }
    }
}

/// Lexical-overlap retriever over an in-memory passage set.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    documents: Vec<Document>,
}

impl KeywordRetriever {
    /// Creates a retriever over the given passages.
    #[must_use]
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Loads every `.txt` and `.md` file under `dir` (non-recursive), one
    /// passage per blank-line separated paragraph.
    ///
    /// # Errors
    /// Returns `RetrievalError::Unavailable` if the directory or a file cannot be read.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| RetrievalError::Unavailable(format!("{}: {}", dir.display(), e)))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"))
            })
            .collect();
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| RetrievalError::Unavailable(format!("{}: {}", path.display(), e)))?;
            let source = path.file_name().map(|name| name.to_string_lossy().into_owned());
            for (index, paragraph) in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).enumerate() {
                let stem = source.as_deref().unwrap_or("doc");
                documents.push(Document {
                    id: format!("{stem}#{index}"),
                    text: paragraph.to_string(),
                    source: source.clone(),
                });
            }
        }

        debug!(dir = %dir.display(), passages = documents.len(), "Loaded keyword corpus");
        Ok(Self::new(documents))
    }

    /// Number of passages held.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the retriever holds no passages.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(
        &self,
        query: &str,
        options: &RetrieverOptions,
    ) -> Result<Vec<ScoredPassage>, RetrievalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "query has no searchable terms".to_string(),
            ));
        }

        let mut scored: Vec<(f32, &Document)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let doc_terms = terms(&doc.text);
                let hits = query_terms.intersection(&doc_terms).count();
                (hits > 0).then(|| (hits as f32 / query_terms.len() as f32, doc))
            })
            .collect();

        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(options.top_k.unwrap_or(DEFAULT_TOP_K));

        Ok(scored
            .into_iter()
            .map(|(score, doc)| {
                let passage = ScoredPassage::new(doc.id.clone(), doc.text.clone(), score);
                match &doc.source {
                    Some(source) => passage.with_source(source.clone()),
                    None => passage,
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
