//! Resource envelope shared by all Capstan kinds

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::Result;

/// API group of Capstan resources
pub const API_GROUP: &str = "capstan.dev";

/// Served version
pub const API_VERSION: &str = "v1beta1";

/// `apiVersion` field value of Capstan resources
pub const GROUP_VERSION: &str = "capstan.dev/v1beta1";

/// The subset of object metadata the engine needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// A typed Capstan object: `apiVersion`, `kind`, `metadata` and `spec`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<S> {
    pub api_version: String,
    pub kind: String,
    pub metadata: ResourceMeta,
    pub spec: S,
}

impl<S> Resource<S> {
    pub fn new(kind: &str, metadata: ResourceMeta, spec: S) -> Self {
        Self {
            api_version: GROUP_VERSION.to_string(),
            kind: kind.to_string(),
            metadata,
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Namespace, treating an empty string as cluster scope
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// `namespace/name` or just `name` for cluster-scoped objects
    pub fn display_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.metadata.name),
            None => self.metadata.name.clone(),
        }
    }
}

impl<S: DeserializeOwned> Resource<S> {
    /// Parse from a YAML (or JSON) document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Convert from a generic JSON object, e.g. one fetched from the cluster
    pub fn from_json(value: JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapSpec, Capability};
    use std::io::Write;

    const CAPABILITY: &str = r#"
apiVersion: capstan.dev/v1beta1
kind: ClusterCapability
metadata:
  name: web
  resourceVersion: "12"
spec:
  source:
    repo:
      uri: https://git.example.com/charts.git
"#;

    #[test]
    fn test_from_yaml_ignores_unknown_metadata() {
        let cap: Capability = Resource::from_yaml(CAPABILITY).unwrap();
        assert_eq!(cap.kind, "ClusterCapability");
        assert_eq!(cap.name(), "web");
        assert_eq!(cap.namespace(), None);
        assert_eq!(cap.display_name(), "web");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CAPABILITY.as_bytes()).unwrap();

        let cap: Resource<CapSpec> = Resource::from_file(file.path()).unwrap();
        assert!(cap.spec.source.is_repo());
    }

    #[test]
    fn test_empty_namespace_is_cluster_scope() {
        let cap = Resource::new(
            "Capability",
            ResourceMeta {
                name: "web".into(),
                namespace: Some(String::new()),
                uid: None,
            },
            CapSpec::default(),
        );
        assert_eq!(cap.namespace(), None);
        assert_eq!(cap.api_version, GROUP_VERSION);
    }
}
