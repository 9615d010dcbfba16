//! Typed contract for JSON replies from the chat model.
//!
//! A reply is accepted when one of its candidate payloads (the whole reply,
//! a fenced code block, or the outermost bracketed span) deserializes into
//! the target type and passes its validation.

use serde::de::{ self, DeserializeOwned, Deserializer };
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructuredOutputError {
    #[error("model reply contained no JSON payload")]
    NoJson,
    #[error("model reply is not valid JSON for the expected shape: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("model reply failed validation: {0}")]
    Invalid(String),
}

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

pub fn parse_structured<T>(reply: &str) -> Result<T, StructuredOutputError>
    where T: DeserializeOwned + Validate
{
    let mut last_error = StructuredOutputError::NoJson;

    for candidate in json_candidates(reply) {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => {
                value.validate().map_err(StructuredOutputError::Invalid)?;
                return Ok(value);
            }
            Err(e) => {
                last_error = StructuredOutputError::InvalidJson(e);
            }
        }
    }

    Err(last_error)
}

fn json_candidates(reply: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let trimmed = reply.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        candidates.push(trimmed);
    }
    if let Some(fenced) = fenced_block(reply) {
        candidates.push(fenced);
    }
    if let Some(span) = bracketed_span(reply) {
        if !candidates.contains(&span) {
            candidates.push(span);
        }
    }
    candidates
}

fn fenced_block(reply: &str) -> Option<&str> {
    let open = reply.find("```")?;
    let after_ticks = &reply[open + 3..];
    // Skip an info string such as `json` up to the end of the line.
    let body_start = after_ticks.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    let block = body[..close].trim();
    if block.is_empty() { None } else { Some(block) }
}

fn bracketed_span(reply: &str) -> Option<&str> {
    let start = reply.find(['{', '['])?;
    let closer = if reply[start..].starts_with('{') { '}' } else { ']' };
    let end = reply.rfind(closer)?;
    if end <= start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Treats a null or missing string as empty.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
    where D: Deserializer<'de>
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `["A", "B"]`, `"A, B"` or null.
pub fn flexible_authors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where D: Deserializer<'de>
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let names = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) =>
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        Some(other) => {
            return Err(de::Error::custom(format!("authors must be a list of names, got {}", other)));
        }
    };
    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

/// Accepts `2021`, `"2021"`, `"c. 2021"` or null; anything without a year becomes `None`.
pub fn flexible_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where D: Deserializer<'de>
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(Value::String(s)) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.len() == 4 { digits.parse().ok() } else { None }
        }
        _ => None,
    })
}
