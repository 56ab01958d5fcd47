//! Placeholder substitution over JSON documents
//!
//! Two forms are recognized in string leaves:
//!
//! - a **full** placeholder, where the whole string is `{{ id }}`; it is
//!   replaced by the resolved value with its native type (numbers stay
//!   numbers, lists stay lists)
//! - **partial** placeholders, one or more `{{ id }}` inside a longer string;
//!   each must resolve to a string and is spliced in place
//!
//! Whitespace inside the braces is optional. An id is any run of characters
//! that are neither whitespace nor braces.

use capstan_core::{ResolvedValueSet, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::error::{EngineError, Result};

static FULL_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\s*([^\s{}]+)\s*\}\}$").expect("valid regex"));

static PART_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^\s{}]+)\s*\}\}").expect("valid regex"));

/// Id of a full placeholder, if `s` is exactly one
pub fn full_placeholder(s: &str) -> Option<&str> {
    FULL_PLACEHOLDER
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Substitute a single string leaf
///
/// An unresolved full placeholder becomes `null`. An unresolved partial
/// placeholder is an error, like any other non-string value.
pub fn substitute_str(s: &str, values: &ResolvedValueSet) -> Result<JsonValue> {
    if let Some(id) = full_placeholder(s) {
        return Ok(values.get(id).map(Value::to_json).unwrap_or(JsonValue::Null));
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut matched = false;

    for caps in PART_PLACEHOLDER.captures_iter(s) {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let replacement = match values.get(id.as_str()) {
            Some(Value::String(v)) => v,
            _ => {
                return Err(EngineError::NonStringInterpolation {
                    id: id.as_str().to_string(),
                });
            }
        };

        out.push_str(&s[last..whole.start()]);
        out.push_str(replacement);
        last = whole.end();
        matched = true;
    }

    if !matched {
        return Ok(JsonValue::String(s.to_string()));
    }

    out.push_str(&s[last..]);
    Ok(JsonValue::String(out))
}

/// Substitute every string leaf reachable through mappings
///
/// Sequences are passed through untouched unless `descend_into_sequences`
/// is set. Other scalars are always passed through.
pub fn substitute(
    node: &JsonValue,
    values: &ResolvedValueSet,
    descend_into_sequences: bool,
) -> Result<JsonValue> {
    match node {
        JsonValue::String(s) => substitute_str(s, values),
        JsonValue::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                out.insert(key.clone(), substitute(value, values, descend_into_sequences)?);
            }
            Ok(JsonValue::Object(out))
        }
        JsonValue::Array(items) if descend_into_sequences => items
            .iter()
            .map(|item| substitute(item, values, descend_into_sequences))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array),
        other => Ok(other.clone()),
    }
}
