//! Recovers a JSON object from generator output.
//!
//! Generated text is frequently wrapped in a Markdown code fence (optionally labelled with a
//! language) or prefixed with a bare `json` / `JSON:` label line. [`extract_object`] removes at most
//! one outer fence, then at most one leading label, and parses the rest.

use serde_json::{Map, Value};

use crate::error::ParseError;

const FENCE: &str = "```";

/// Extracts the top-level JSON object from `text`.
pub fn extract_object(text: &str) -> Result<Map<String, Value>, ParseError> {
    let body = strip_label(strip_fence(text.trim()));
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::NotAnObject {
            found: value_kind(&other),
        }),
    }
}

/// Removes one well-formed outer fence. A lone, unpaired marker is left untouched.
pub fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };
    let Some(closing) = rest.rfind(FENCE) else {
        return text;
    };

    let inner = &rest[..closing];
    match inner.split_once('\n') {
        Some((first_line, remainder)) if is_language_label(first_line) => remainder.trim(),
        _ if is_language_label(inner) => "",
        _ => inner.trim(),
    }
}

/// Removes a leading bare `json` label, with or without a trailing colon.
pub fn strip_label(text: &str) -> &str {
    let text = text.trim_start();
    let Some(head) = text.get(..4) else {
        return text;
    };
    if !head.eq_ignore_ascii_case("json") {
        return text;
    }

    let rest = &text[4..];
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('：'))
        .unwrap_or(rest);
    if rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with(['{', '[']) {
        rest.trim_start()
    } else {
        text
    }
}

fn is_language_label(line: &str) -> bool {
    let line = line.trim();
    let line = line.strip_suffix(':').unwrap_or(line);
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
