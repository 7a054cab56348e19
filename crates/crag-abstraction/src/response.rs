//! Response shapes produced by language-model providers.
//!
//! Providers are not contractually bound to one response shape. Some return a
//! completion whose `text` is a plain string, some put a chat message object in
//! `text`, and some hand back the message object itself. Each known producer
//! shape is a variant of [`ProviderResponse`]; the orchestrator folds all of
//! them into a [`CanonicalResponse`] before anything reads the text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chat message object as returned by message-oriented providers.
///
/// `content` is usually a string but some providers return structured parts,
/// and some omit it entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageObject {
    /// Message role (e.g. "assistant").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Message content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Any other provider-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageObject {
    /// Creates an assistant message with string content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Some("assistant".to_string()),
            content: Some(Value::String(content.into())),
            extra: Map::new(),
        }
    }
}

/// The `text` field of a completion object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionText {
    /// A plain string completion.
    Plain(String),
    /// A message object where a string was expected.
    Message(MessageObject),
}

/// The one normalized shape every model output is forced into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResponse {
    /// The response text.
    pub text: String,
    /// The original provider response, serialized.
    pub raw: Value,
}

/// A raw provider response, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "body", rename_all = "snake_case")]
pub enum ProviderResponse {
    /// A bare string-like completion.
    Text(String),
    /// A completion object whose `text` may itself be a message object.
    Completion {
        /// The completion text.
        text: CompletionText,
        /// Provider payload the completion was extracted from, if any.
        #[serde(default)]
        raw: Value,
    },
    /// A bare message object passed where a completion was expected.
    Message(MessageObject),
    /// An already-normalized response.
    Canonical(CanonicalResponse),
    /// Any other JSON shape.
    Json(Value),
}

impl ProviderResponse {
    /// Creates a plain text response.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a completion whose text is a plain string.
    pub fn completion(text: impl Into<String>) -> Self {
        Self::Completion { text: CompletionText::Plain(text.into()), raw: Value::Null }
    }

    /// Creates a bare assistant message response.
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message(MessageObject::assistant(content))
    }
}

impl From<CanonicalResponse> for ProviderResponse {
    fn from(response: CanonicalResponse) -> Self {
        Self::Canonical(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_message_object_keeps_unknown_fields() {
        let message: MessageObject = serde_json::from_value(json!({
            "role": "assistant",
            "content": "yes",
            "refusal": null
        }))
        .unwrap();

        assert_eq!(message.role.as_deref(), Some("assistant"));
        assert_eq!(message.content, Some(json!("yes")));
        assert!(message.extra.contains_key("refusal"));
    }

    #[test]
    fn test_completion_text_untagged() {
        let plain: CompletionText = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(plain, CompletionText::Plain("hello".to_string()));

        let message: CompletionText =
            serde_json::from_value(json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(message, CompletionText::Message(MessageObject::assistant("hi")));
    }

    #[test]
    fn test_provider_response_is_tagged_by_shape() {
        let value = serde_json::to_value(ProviderResponse::text("hi")).unwrap();
        assert_eq!(value, json!({"shape": "text", "body": "hi"}));
    }
}
