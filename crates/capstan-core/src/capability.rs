//! Capability schema: typed inputs, fixed values, source and outputs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::resource::Resource;
use crate::value::Value;

/// Namespace-scoped capability kind
pub const CAPABILITY_KIND: &str = "Capability";

/// Cluster-scoped capability kind
pub const CLUSTER_CAPABILITY_KIND: &str = "ClusterCapability";

/// Separately declared dependency kind
pub const DEPENDENCY_KIND: &str = "CapabilityDependency";

/// A namespace- or cluster-scoped capability
pub type Capability = Resource<CapSpec>;

/// A dependency declared next to a capability, with its own values and source
pub type CapabilityDependency = Resource<DependencySpec>;

/// Declared type of a capability input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    /// A string that must not be echoed back in logs or output
    Password,
    Int,
    Float,
    StringList,
}

impl InputType {
    /// Check whether a caller value satisfies this declared type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (InputType::String | InputType::Password, Value::String(_)) => true,
            (InputType::Int, Value::Int(_)) => true,
            (InputType::Float, Value::Float(_)) => true,
            (InputType::StringList, Value::StringList(_)) => true,
            _ => false,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, InputType::Password)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::String => "string",
            InputType::Password => "password",
            InputType::Int => "int",
            InputType::Float => "float",
            InputType::StringList => "stringlist",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input a capability accepts from apps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    /// Caller-facing name
    pub key: String,

    #[serde(rename = "type")]
    pub input_type: InputType,

    #[serde(default)]
    pub optional: bool,

    /// Name used inside templates and chart values
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_id: String,
}

impl InputSpec {
    /// Target identifier, falling back to the key when none is declared
    pub fn target(&self) -> &str {
        if self.target_id.is_empty() {
            &self.key
        } else {
            &self.target_id
        }
    }
}

/// A fixed value provided by a capability or dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapValue {
    pub target_id: String,
    pub value: Value,
}

/// Git repository holding a chart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSpec {
    pub uri: String,

    #[serde(default, rename = "ref", skip_serializing_if = "String::is_empty")]
    pub git_ref: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// How a capability materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Templated manifests embedded in the capability
    Inline,
    /// A chart in an external repository
    Chart,
}

impl SourceKind {
    pub fn parse(kind: &str) -> Result<Self> {
        match kind {
            "inline" => Ok(SourceKind::Inline),
            "chart" => Ok(SourceKind::Chart),
            other => Err(CoreError::UnknownSourceKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Source descriptor as written in the resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapSource {
    /// Optional explicit kind (`inline` or `chart`); inferred when absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Manifest templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<Vec<JsonValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoSpec>,
}

/// A checked source: exactly one materialization mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Materialization<'a> {
    Inline(&'a [JsonValue]),
    Chart(&'a RepoSpec),
}

impl Materialization<'_> {
    pub fn kind(&self) -> SourceKind {
        match self {
            Materialization::Inline(_) => SourceKind::Inline,
            Materialization::Chart(_) => SourceKind::Chart,
        }
    }
}

impl CapSource {
    pub fn is_inline(&self) -> bool {
        self.inline.is_some()
    }

    pub fn is_repo(&self) -> bool {
        self.repo.as_ref().is_some_and(|r| !r.uri.is_empty())
    }

    /// Validate that exactly one mode is set and agrees with the declared kind
    pub fn check(&self) -> Result<Materialization<'_>> {
        let declared = self.kind.as_deref().map(SourceKind::parse).transpose()?;

        let materialization = match (&self.inline, &self.repo) {
            (Some(_), Some(repo)) if !repo.uri.is_empty() => {
                return Err(CoreError::InvalidSourceSpec {
                    reason: "both inline and repo specified".to_string(),
                });
            }
            (Some(manifests), _) => Materialization::Inline(manifests),
            (None, Some(repo)) if !repo.uri.is_empty() => Materialization::Chart(repo),
            _ => {
                return Err(CoreError::InvalidSourceSpec {
                    reason: "neither inline nor repo specified".to_string(),
                });
            }
        };

        if let Some(kind) = declared {
            if kind != materialization.kind() {
                return Err(CoreError::InvalidSourceSpec {
                    reason: format!(
                        "source type '{}' does not match the given material",
                        self.kind.as_deref().unwrap_or_default()
                    ),
                });
            }
        }

        Ok(materialization)
    }
}

/// Reference to an object an output is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A value read back from a live object after materialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    pub target_id: String,
    pub object_ref: ObjectRef,
    /// Path into the object body, e.g. `.status.loadBalancer.ingress[0].ip`
    pub field_path: String,
}

/// Reference to a `CapabilityDependency`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Spec of a `Capability` / `ClusterCapability`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapSpec {
    #[serde(default)]
    pub inputs: Vec<InputSpec>,

    #[serde(default)]
    pub values: Vec<CapValue>,

    pub source: CapSource,

    #[serde(default)]
    pub outputs: Vec<OutputSpec>,

    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

/// Spec of a `CapabilityDependency`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    #[serde(default)]
    pub values: Vec<CapValue>,

    pub source: CapSource,
}
