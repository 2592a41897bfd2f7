//! Structured data extraction from language-model output
//!
//! Model responses are free-form text that usually, but not always, carry a
//! JSON object either inside a markdown code fence or as bare braces
//! surrounded by prose. Extraction fails closed: anything that does not yield
//! a JSON object is a [`ParseError`].

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Failure to turn a model response into a typed value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),

    #[error("response is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Locates the JSON object inside a model response
///
/// A fenced block (```` ```json ```` or bare ```` ``` ````) wins when its body
/// is an object; otherwise the span from the first `{` to the last `}` is used.
pub fn extract_json(response: &str) -> Result<&str, ParseError> {
    let trimmed = response.trim();

    if let Some(body) = fenced_body(trimmed) {
        if body.starts_with('{') && body.ends_with('}') {
            return Ok(body);
        }
    }

    let start = trimmed.find('{').ok_or(ParseError::NoJson)?;
    let end = trimmed.rfind('}').ok_or(ParseError::NoJson)?;
    if start < end {
        Ok(&trimmed[start..=end])
    } else {
        Err(ParseError::NoJson)
    }
}

/// Body of the first markdown code fence, trimmed
fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip the info string (e.g. "json") up to the end of the fence line
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Extracts and deserializes the JSON object inside a model response
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, ParseError> {
    let json = extract_json(response)?;
    serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Deserializes a score that may arrive as a number, a numeric string, or garbage
///
/// Anything that is not a finite number becomes `0.0`; this never fails.
pub fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(score_from_value(&value))
}

pub fn score_from_value(value: &Value) -> f64 {
    let score = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if score.is_finite() { score } else { 0.0 }
}

/// Deserializes a list of strings, tolerating `null`, a single string, or mixed entries
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// Deserializes an optional string, treating non-strings as absent
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
