//! Pipeline agents.
//!
//! Each agent wraps one capability call (retriever, language model, or web
//! search) and reports the result as an [`Outcome`](crate::Outcome).

pub mod answer;
pub mod relevance;
pub mod retrieval;
pub mod web_search;

pub use answer::AnswerAgent;
pub use relevance::{GradingReport, RelevanceGrader, Verdict, clean_verdict, is_relevant};
pub use retrieval::RetrievalAgent;
pub use web_search::{WebSearchAgent, flatten_hits};
