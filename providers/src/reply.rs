//! Extraction of the nutrition object from a classifier's free-text reply.
//!
//! Models are asked for bare JSON but routinely wrap it in markdown fences or
//! surround it with prose. [`extract_nutrition`] is the only place that format
//! is interpreted:
//!
//! 1. Every ```` ``` ```` fence marker (with its info string, e.g. `json`) is removed.
//! 2. The remainder is decoded as one JSON object if possible.
//! 3. Otherwise the first balanced `{ ... }` span is decoded, skipping braces
//!    inside string literals.
//! 4. An object carrying an `"error"` key is the model declining the task.
//! 5. Anything else must decode strictly into [`RawNutrition`].

use nutrilens_types::RawNutrition;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyParseError {
    #[error("reply is empty")]
    Empty,
    #[error("reply contains no JSON object")]
    NoJsonObject,
    #[error("JSON object is truncated")]
    Truncated,
    #[error("malformed nutrition JSON: {0}")]
    Malformed(String),
    #[error("{0}")]
    ClassifierError(String),
}

pub fn extract_nutrition(reply: &str) -> Result<RawNutrition, ReplyParseError> {
    let cleaned = strip_code_fences(reply);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(ReplyParseError::Empty);
    }

    let object = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => map,
        _ => {
            let span = find_json_object(cleaned)?;
            match serde_json::from_str::<Value>(span) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(ReplyParseError::NoJsonObject),
                Err(e) => return Err(ReplyParseError::Malformed(e.to_string())),
            }
        }
    };

    decode_object(object)
}

/// Remove markdown fence markers and their info strings.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

/// Locate the first balanced JSON object span in `text`.
fn find_json_object(text: &str) -> Result<&str, ReplyParseError> {
    let start = text.find('{').ok_or(ReplyParseError::NoJsonObject)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(ReplyParseError::Truncated)
}

fn decode_object(object: Map<String, Value>) -> Result<RawNutrition, ReplyParseError> {
    if let Some(error) = object.get("error") {
        let message = match error {
            Value::String(message) => message.clone(),
            Value::Object(inner) => inner
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), ToString::to_string),
            other => other.to_string(),
        };
        return Err(ReplyParseError::ClassifierError(message));
    }

    serde_json::from_value(Value::Object(object))
        .map_err(|e| ReplyParseError::Malformed(e.to_string()))
}
