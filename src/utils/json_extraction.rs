//! JSON extraction for generation service responses.
//!
//! Some deployments of the generation service answer with the document
//! wrapped in prose or a markdown fence, sometimes double-encoded as a JSON
//! string. This module digs the JSON object back out.
//!
//! # Extraction Strategies
//!
//! Tried in order:
//! 1. Content inside a ```json fence
//! 2. Content inside a generic ``` fence
//! 3. Direct JSON (content starts with '{')
//! 4. First balanced object anywhere in the content
//!
//! # Example
//!
//! ```
//! use adforge::utils::json_extraction::extract_json_object;
//!
//! let reply = "Here you go:\n```json\n{\"list_of_keywords\": []}\n```";
//! assert_eq!(extract_json_object(reply).unwrap(), "{\"list_of_keywords\": []}");
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json\s*\n?([\s\S]*?)\n?```").expect("valid json fence pattern")
});

static GENERIC_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").expect("valid fence pattern")
});

/// Error type for JSON extraction failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("JSON appears truncated: {unclosed_braces} unclosed braces. Partial: {partial_preview}...")]
    Truncated {
        partial_preview: String,
        unclosed_braces: usize,
    },
    #[error("No JSON object found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },
}

/// Normalizes a response body into a JSON value.
///
/// Objects pass through untouched. A JSON string is treated as text and the
/// object inside it is extracted and parsed.
pub fn normalize_response_body(body: Value) -> Result<Value, JsonExtractionError> {
    match body {
        Value::String(text) => {
            let json = extract_json_object(&text)?;
            serde_json::from_str(&json).map_err(|_| JsonExtractionError::NotFound {
                content_preview: preview(&text, 50),
            })
        }
        other => Ok(other),
    }
}

/// Extracts the first complete JSON object from free-form text.
pub fn extract_json_object(content: &str) -> Result<String, JsonExtractionError> {
    let trimmed = content.trim();

    if let Some(json) = extract_from_json_code_block(trimmed) {
        if is_valid_json(&json) {
            return Ok(json);
        }
    }

    if let Some(json) = extract_from_generic_code_block(trimmed) {
        if is_valid_json(&json) {
            return Ok(json);
        }
    }

    if let Some(start) = trimmed.find('{') {
        let candidate_region = &trimmed[start..];
        if let Some(end) = find_matching_brace(candidate_region) {
            let candidate = &candidate_region[..=end];
            if is_valid_json(candidate) {
                return Ok(candidate.to_string());
            }
        }

        let unclosed_braces = unclosed_braces(candidate_region);
        if unclosed_braces > 0 {
            return Err(JsonExtractionError::Truncated {
                partial_preview: preview(candidate_region, 100),
                unclosed_braces,
            });
        }
    }

    Err(JsonExtractionError::NotFound {
        content_preview: preview(trimmed, 50),
    })
}

/// Finds the index of the brace closing the object that starts at `s[0]`.
///
/// String literals and escape sequences are skipped.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract JSON from a ```json ... ``` code block.
pub fn extract_from_json_code_block(content: &str) -> Option<String> {
    let caps = JSON_FENCE.captures(content)?;
    let json_content = caps.get(1)?.as_str().trim();
    if !json_content.starts_with('{') {
        return None;
    }
    match find_matching_brace(json_content) {
        Some(end) => Some(json_content[..=end].to_string()),
        None => Some(json_content.to_string()),
    }
}

/// Extract JSON from a generic ``` ... ``` code block.
pub fn extract_from_generic_code_block(content: &str) -> Option<String> {
    let caps = GENERIC_FENCE.captures(content)?;
    let block_content = caps.get(1)?.as_str().trim();
    let start = block_content.find('{')?;
    let end = find_matching_brace(&block_content[start..])?;
    Some(block_content[start..=start + end].to_string())
}

fn is_valid_json(candidate: &str) -> bool {
    serde_json::from_str::<Value>(candidate).is_ok()
}

fn unclosed_braces(s: &str) -> usize {
    let mut depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for c in s.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }

    depth.max(0) as usize
}

fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
