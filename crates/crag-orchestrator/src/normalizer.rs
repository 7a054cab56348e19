// Response normalization
//
// Folds every provider response shape into a CanonicalResponse. Nothing
// downstream reads model text without going through `normalize` first.

use crag_abstraction::{CanonicalResponse, CompletionText, MessageObject, ProviderResponse};
use serde_json::Value;

/// Normalizes a provider response.
///
/// Never fails: shapes it does not recognize are stringified. Applying it to
/// an already canonical response returns that response unchanged.
pub fn normalize(response: ProviderResponse) -> CanonicalResponse {
    let raw = raw_of(&response);
    let text = match response {
        ProviderResponse::Canonical(canonical) => return canonical,
        ProviderResponse::Text(text)
        | ProviderResponse::Completion { text: CompletionText::Plain(text), .. } => text,
        ProviderResponse::Completion { text: CompletionText::Message(message), .. }
        | ProviderResponse::Message(message) => message_text(&message),
        ProviderResponse::Json(value) => json_text(&value),
    };
    CanonicalResponse { text, raw }
}

fn raw_of(response: &ProviderResponse) -> Value {
    match response {
        ProviderResponse::Completion { raw, .. } if !raw.is_null() => raw.clone(),
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

fn message_text(message: &MessageObject) -> String {
    match &message.content {
        Some(content) if !content.is_null() => content_text(content),
        _ => serde_json::to_string(message).unwrap_or_default(),
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        // OpenAI-style content parts: [{"type": "text", "text": "..."}]
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() { content.to_string() } else { texts.concat() }
        }
        other => other.to_string(),
    }
}

fn json_text(value: &Value) -> String {
    match value.get("text") {
        Some(Value::String(text)) => return text.clone(),
        Some(inner @ Value::Object(_)) => {
            if let Ok(message) = serde_json::from_value::<MessageObject>(inner.clone()) {
                return message_text(&message);
            }
        }
        _ => {}
    }
    match value.get("content") {
        Some(content) if !content.is_null() => content_text(content),
        _ => match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crag_abstraction::MessageObject;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_plain_text() {
        let canonical = normalize(ProviderResponse::text("hello"));
        assert_eq!(canonical.text, "hello");
        assert_eq!(canonical.raw, json!({"shape": "text", "body": "hello"}));
    }

    #[test]
    fn test_completion_with_plain_text() {
        assert_eq!(normalize(ProviderResponse::completion("yes")).text, "yes");
    }

    #[test]
    fn test_completion_wrapping_message_object() {
        let response = ProviderResponse::Completion {
            text: CompletionText::Message(MessageObject::assistant("Python is a language.")),
            raw: json!({"choices": [{"message": {"content": "Python is a language."}}]}),
        };
        let canonical = normalize(response);
        assert_eq!(canonical.text, "Python is a language.");
        assert_eq!(canonical.raw["choices"][0]["message"]["content"], "Python is a language.");
    }

    #[test]
    fn test_bare_message() {
        assert_eq!(normalize(ProviderResponse::message("no")).text, "no");
    }

    #[test]
    fn test_message_without_content_is_stringified() {
        let message = MessageObject { role: Some("assistant".to_string()), ..Default::default() };
        let canonical = normalize(ProviderResponse::Message(message));
        assert_eq!(canonical.text, r#"{"role":"assistant"}"#);
    }

    #[test]
    fn test_message_with_content_parts() {
        let message = MessageObject {
            role: None,
            content: Some(json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}])),
            extra: serde_json::Map::new(),
        };
        assert_eq!(normalize(ProviderResponse::Message(message)).text, "ab");
    }

    #[test]
    fn test_message_with_non_string_content() {
        let message = MessageObject { role: None, content: Some(json!(42)), extra: serde_json::Map::new() };
        assert_eq!(normalize(ProviderResponse::Message(message)).text, "42");
    }

    #[test]
    fn test_json_shapes() {
        assert_eq!(normalize(ProviderResponse::Json(json!({"text": "t"}))).text, "t");
        assert_eq!(
            normalize(ProviderResponse::Json(json!({"text": {"role": "assistant", "content": "inner"}}))).text,
            "inner"
        );
        assert_eq!(normalize(ProviderResponse::Json(json!({"content": "c"}))).text, "c");
        assert_eq!(normalize(ProviderResponse::Json(json!({"other": 1}))).text, r#"{"other":1}"#);
        assert_eq!(normalize(ProviderResponse::Json(json!("bare"))).text, "bare");
    }

    #[test]
    fn test_idempotent() {
        let shapes = vec![
            ProviderResponse::text("plain"),
            ProviderResponse::completion("completion"),
            ProviderResponse::message("message"),
            ProviderResponse::Json(json!({"content": "json"})),
        ];
        for shape in shapes {
            let once = normalize(shape);
            let twice = normalize(ProviderResponse::Canonical(once.clone()));
            assert_eq!(twice, once);
        }
    }
}
