//! Turns raw provider text into something a handler can return.
//!
//! Models wrap their output in markdown no matter how firmly the prompt asks
//! them not to, so every textual result passes through here before it reaches
//! a client.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Error indicator used in the fallback object for unparseable JSON output.
pub const INVALID_FORMAT_ERROR: &str = "Invalid response format from AI";

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = if let Some(stripped) = text.strip_prefix("```json") {
        stripped
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
    } else {
        return text;
    };
    let inner = inner.trim_start();
    inner
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or_else(|| inner.trim_end())
}

/// Removes markdown artifacts and line breaks, leaving a single line of prose.
pub fn sanitize_text(text: &str) -> String {
    let without_fences = text.replace("```json", "").replace('`', "");

    let without_headings: Vec<&str> = without_fences
        .lines()
        .map(|line| line.trim_start().trim_start_matches('#'))
        .collect();

    let joined = without_headings
        .join(" ")
        .replace("\\n", " ")
        .replace("**", "")
        .replace("__", "")
        .replace('*', "");

    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the span from the first `{` to the last `}`, if any.
pub fn extract_json_span(text: &str) -> Option<&str> {
    span_between(text, '{', '}')
}

/// Returns the span from the first `[` to the last `]`, if any.
pub fn extract_json_array_span(text: &str) -> Option<&str> {
    span_between(text, '[', ']')
}

fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parses a JSON object out of provider text.
///
/// Never fails: when the text is not valid JSON the result is
/// `{"error": ..., "raw": <original text>}` so the request can still succeed.
pub fn parse_json_or_fallback(raw: &str) -> Value {
    let stripped = strip_json_fences(raw);
    let candidate = extract_json_span(stripped).unwrap_or(stripped);

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse AI response as JSON: {e}");
            fallback(raw)
        }
    }
}

/// Strictly parses a JSON array of `T` out of provider text.
pub fn parse_json_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, serde_json::Error> {
    let stripped = strip_json_fences(raw);
    let candidate = extract_json_array_span(stripped).unwrap_or(stripped);
    serde_json::from_str(candidate)
}

/// The error-shaped object returned in place of unparseable output.
pub fn fallback(raw: &str) -> Value {
    json!({
        "error": INVALID_FORMAT_ERROR,
        "raw": raw,
    })
}
