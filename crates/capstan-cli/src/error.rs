//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use capstan_core::CoreError;
use capstan_engine::EngineError;
use capstan_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Validation failed (required inputs or types)
    #[error("Validation failed: {message}")]
    #[diagnostic(code(capstan::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Materialization failed
    #[error("Render error: {message}")]
    #[diagnostic(code(capstan::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A resource file could not be loaded or is malformed
    #[error("Resource error: {message}")]
    #[diagnostic(code(capstan::cli::resource))]
    Resource {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cluster interaction failed
    #[error("Cluster error: {message}")]
    #[diagnostic(code(capstan::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(capstan::cli::io))]
    Io { message: String },

    /// Some apps in a batch failed
    #[error("{failed} of {total} app(s) failed to reconcile")]
    #[diagnostic(code(capstan::cli::batch))]
    BatchFailed { failed: usize, total: usize },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(capstan::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Resource { .. } => exit_codes::RESOURCE_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::BatchFailed { .. } => exit_codes::ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            help: None,
        }
    }

    /// Create a resource error with help text
    pub fn resource_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a cluster error
    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingRequiredInput { .. }
            | CoreError::TypeMismatch { .. }
            | CoreError::InvalidValue { .. } => CliError::validation(err.to_string()),
            CoreError::InvalidSourceSpec { .. } | CoreError::UnknownSourceKind { .. } => {
                CliError::render(err.to_string())
            }
            CoreError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            other => CliError::Resource {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Source(core) => core.into(),
            EngineError::NonStringInterpolation { ref id } => CliError::Render {
                help: Some(format!(
                    "use a full placeholder like \"{{{{ {id} }}}}\" to insert non-string values"
                )),
                message: err.to_string(),
            },
            other => CliError::render(other.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Engine(engine) => engine.into(),
            KubeError::Timeout(_) => CliError::Cluster {
                message: err.to_string(),
                help: Some("raise the limit with --timeout or CAPSTAN_TIMEOUT".to_string()),
            },
            other => CliError::cluster(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
