//! Error types for capstan-kube

use capstan_core::CoreError;
use capstan_engine::EngineError;
use thiserror::Error;

/// Result type for capstan-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reconciling against a cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// A referenced object does not exist
    #[error("object {key} not found")]
    ObjectNotFound { key: String },

    /// Create was called for an object that already exists
    #[error("object {key} already exists")]
    AlreadyExists { key: String },

    /// The API server does not serve this kind
    #[error("unknown resource type: {api_version}/{kind}")]
    UnknownResource { api_version: String, kind: String },

    /// An output field path did not resolve
    #[error("output '{target_id}': field path '{field_path}' not found")]
    OutputFieldNotFound {
        target_id: String,
        field_path: String,
    },

    /// An output field path resolved to a non-string value
    #[error("output '{target_id}' is not a string")]
    OutputNotString { target_id: String },

    /// Resolution or source checks failed
    #[error(transparent)]
    Core(CoreError),

    /// Substitution failed
    #[error(transparent)]
    Engine(EngineError),

    /// Timeout
    #[error("operation timed out after {0}")]
    Timeout(String),

    /// Invalid manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<CoreError> for KubeError {
    fn from(e: CoreError) -> Self {
        KubeError::Core(e)
    }
}

impl From<EngineError> for KubeError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Source(core) => KubeError::Core(core),
            other => KubeError::Engine(other),
        }
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
            || matches!(self, KubeError::ObjectNotFound { .. })
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
            || matches!(self, KubeError::AlreadyExists { .. })
    }
}
