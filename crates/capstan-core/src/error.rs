//! Core error types

use thiserror::Error;

use crate::capability::InputType;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("required key '{key}' not found in App values")]
    MissingRequiredInput { key: String },

    #[error("required input '{key}' is not of type '{expected}'")]
    TypeMismatch { key: String, expected: InputType },

    #[error("invalid capability source: {reason}")]
    InvalidSourceSpec { reason: String },

    #[error("unknown capability source type '{kind}'")]
    UnknownSourceKind { kind: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
