//! Dynamically typed values supplied by capabilities and callers
//!
//! Values arrive as untyped YAML/JSON. They are converted once into [`Value`],
//! a tagged variant, so that input type checks become a `match` on the tag
//! instead of runtime inspection of raw JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// A resolved value with its native type preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A sequence whose elements are all strings
    StringList(Vec<String>),
    /// Any other sequence
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::StringList(_) => "stringlist",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Borrow the string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a JSON tree for embedding into manifests
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::StringList(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => {
                if items.iter().all(JsonValue::is_string) {
                    Value::StringList(
                        items
                            .into_iter()
                            .filter_map(|item| match item {
                                JsonValue::String(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    )
                } else {
                    Value::List(items.into_iter().map(Value::from).collect())
                }
            }
            JsonValue::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Parse `key=value` arguments into an ordered override map
///
/// The right-hand side is typed the way a YAML scalar would be:
/// `true`/`false`, `null`, integers, floats, inline JSON lists or maps,
/// and plain strings otherwise.
pub fn parse_overrides(args: &[String]) -> Result<IndexMap<String, Value>> {
    let mut overrides = IndexMap::new();

    for arg in args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::InvalidValue {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::InvalidValue {
                message: format!("Invalid --set format: '{}'. Key must not be empty", arg),
            });
        }

        let value = if val == "true" {
            Value::Bool(true)
        } else if val == "false" {
            Value::Bool(false)
        } else if val == "null" {
            Value::Null
        } else if let Ok(num) = val.parse::<i64>() {
            Value::Int(num)
        } else if let Ok(num) = val.parse::<f64>() {
            Value::Float(num)
        } else if val.starts_with('[') || val.starts_with('{') {
            serde_json::from_str::<JsonValue>(val)
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(val.to_string()))
        } else {
            Value::String(val.to_string())
        };

        overrides.insert(key.to_string(), value);
    }

    Ok(overrides)
}
