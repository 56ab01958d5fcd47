//! Engine error types

use capstan_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    /// A partial placeholder referenced a value that is not a string
    #[error("non-string value used in in-line string replacement for '{id}'")]
    #[diagnostic(
        code(capstan::engine::non_string_interpolation),
        help("only string values can be embedded inside a longer string; use a full placeholder like \"{{{{ {id} }}}}\" to insert other types")
    )]
    NonStringInterpolation { id: String },

    /// An inline template entry is not an object
    #[error("inline manifest #{index} is not an object: {message}")]
    #[diagnostic(code(capstan::engine::invalid_manifest))]
    InvalidManifest { index: usize, message: String },

    /// The capability source failed its checks
    #[error(transparent)]
    #[diagnostic(code(capstan::engine::source))]
    Source(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
