//! Object stores: where reconciled objects are read from and written to
//!
//! - **Kube**: a live cluster through dynamic APIs and discovery
//! - **Mock**: in-memory objects for tests, with operation counters
//!
//! Both work on `DynamicObject`, so manifests of any kind can flow through
//! without compile-time type knowledge.

mod cluster;
mod mock;

pub use cluster::KubeObjectStore;
pub use mock::{EventJournal, MockObjectStore, OperationCounts};

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use std::fmt;

use crate::error::{KubeError, Result};

/// Identity of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            name: name.into(),
        }
    }

    /// Key of an object; `apiVersion`, `kind` and `metadata.name` are required
    pub fn from_object(obj: &DynamicObject) -> Result<Self> {
        let types = obj.types.as_ref().ok_or_else(|| {
            KubeError::InvalidManifest("object missing apiVersion or kind".to_string())
        })?;
        let name = obj.metadata.name.as_deref().ok_or_else(|| {
            KubeError::InvalidManifest(format!("{} missing metadata.name", types.kind))
        })?;

        Ok(Self::new(
            &types.api_version,
            &types.kind,
            obj.metadata.namespace.as_deref(),
            name,
        ))
    }

    pub fn gvk(&self) -> GroupVersionKind {
        gvk_from_api_version(&self.api_version, &self.kind)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version, self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version, self.kind, self.name),
        }
    }
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Mutation applied to an object before it is written
pub type Mutate<'a> = &'a (dyn Fn(&mut DynamicObject) + Send + Sync);

/// Object store trait
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object; `None` when it does not exist
    async fn read(&self, key: &ObjectKey) -> Result<Option<DynamicObject>>;

    /// List objects of a kind, optionally in a single namespace
    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;

    /// Create a new object
    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject>;

    /// Replace an existing object
    async fn update(&self, obj: &DynamicObject) -> Result<DynamicObject>;

    /// Whether objects of a kind live in a namespace
    ///
    /// The default goes by kind name; stores that can ask the server override it.
    async fn is_namespaced(&self, _api_version: &str, kind: &str) -> Result<bool> {
        Ok(!is_cluster_scoped_kind(kind))
    }

    /// Read an object that must exist
    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject> {
        self.read(key)
            .await?
            .ok_or_else(|| KubeError::ObjectNotFound {
                key: key.to_string(),
            })
    }

    /// Create the object if missing, otherwise mutate the live object and
    /// write it back only when the mutation changed it
    async fn upsert(&self, desired: &DynamicObject, mutate: Mutate<'_>) -> Result<UpsertOutcome> {
        let key = ObjectKey::from_object(desired)?;

        match self.read(&key).await? {
            None => {
                let mut obj = desired.clone();
                mutate(&mut obj);
                self.create(&obj).await?;
                Ok(UpsertOutcome::Created)
            }
            Some(live) => {
                let mut obj = live.clone();
                mutate(&mut obj);
                if serde_json::to_value(&obj)? == serde_json::to_value(&live)? {
                    return Ok(UpsertOutcome::Unchanged);
                }
                self.update(&obj).await?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }
}

/// Well-known cluster-scoped kinds
pub const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "CSIDriver",
    "CSINode",
    "ClusterCapability",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "IngressClass",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PriorityClass",
    "RuntimeClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
    "VolumeAttachment",
];

/// Scope of a kind when no server is there to ask
pub fn is_cluster_scoped_kind(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
}

/// Convert an apiVersion and kind to a GroupVersionKind
///
/// - "apps/v1" -> group="apps", version="v1"
/// - "v1" -> group="", version="v1" (core API)
pub fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = match api_version.rsplit_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };

    GroupVersionKind {
        group,
        version,
        kind: kind.to_string(),
    }
}

/// Build a `DynamicObject` from a JSON manifest
pub fn object_from_json(manifest: serde_json::Value) -> Result<DynamicObject> {
    let obj: DynamicObject = serde_json::from_value(manifest)?;
    ObjectKey::from_object(&obj)?;
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gvk_from_api_version() {
        let gvk = gvk_from_api_version("apps/v1", "Deployment");
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");

        let gvk = gvk_from_api_version("v1", "ConfigMap");
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "ConfigMap");
    }

    #[test]
    fn test_object_key_from_manifest() {
        let obj = object_from_json(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "web", "namespace": "shop"},
            "data": {"a": "b"}
        }))
        .unwrap();

        let key = ObjectKey::from_object(&obj).unwrap();
        assert_eq!(key, ObjectKey::new("v1", "ConfigMap", Some("shop"), "web"));
        assert_eq!(key.to_string(), "v1/ConfigMap shop/web");
    }

    #[test]
    fn test_empty_namespace_is_cluster_scope() {
        let key = ObjectKey::new("capstan.dev/v1beta1", "ClusterCapability", Some(""), "web");
        assert_eq!(key.namespace, None);
        assert_eq!(key.to_string(), "capstan.dev/v1beta1/ClusterCapability web");
    }

    #[tokio::test]
    async fn test_default_scope_goes_by_kind() {
        let store = MockObjectStore::new();
        assert!(store.is_namespaced("v1", "ConfigMap").await.unwrap());
        assert!(!store.is_namespaced("rbac.authorization.k8s.io/v1", "ClusterRole").await.unwrap());
        assert!(!store.is_namespaced("capstan.dev/v1beta1", "ClusterCapability").await.unwrap());
    }

    #[test]
    fn test_object_without_name_is_rejected() {
        let err = object_from_json(json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {}}))
            .unwrap_err();
        assert!(matches!(err, KubeError::InvalidManifest(_)));
    }
}
