//! Application instances: a capability reference plus caller values

use serde::{Deserialize, Serialize};

use crate::resource::Resource;
use crate::value::Value;

/// Application kind
pub const APP_KIND: &str = "App";

/// An application instance
pub type App = Resource<AppSpec>;

/// Which capability an app instantiates
///
/// An empty or missing namespace refers to a `ClusterCapability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl CapReference {
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.as_deref().is_none_or(str::is_empty)
    }
}

/// A caller-supplied value, keyed by the capability input key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppValue {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    pub cap_ref: CapReference,

    #[serde(default)]
    pub values: Vec<AppValue>,
}
