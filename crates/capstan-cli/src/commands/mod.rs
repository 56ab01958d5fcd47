//! CLI commands

pub mod crds;
pub mod reconcile;
pub mod render;
pub mod validate;

use capstan_core::{
    App, Capability, CapabilityDependency, CoreError, Resource, APP_KIND, CAPABILITY_KIND,
    CLUSTER_CAPABILITY_KIND, DEPENDENCY_KIND,
};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::{CliError, Result};

/// Load a resource file and check its kind
fn load_resource<S: DeserializeOwned>(path: &Path, kinds: &[&str]) -> Result<Resource<S>> {
    let resource = Resource::<S>::from_file(path).map_err(|e| match e {
        CoreError::Io(io) => CliError::Io {
            message: format!("{}: {}", path.display(), io),
        },
        other => CliError::resource_with_help(
            format!("{}: {}", path.display(), other),
            "resources are YAML or JSON documents with apiVersion, kind, metadata and spec",
        ),
    })?;

    if !kinds.contains(&resource.kind.as_str()) {
        return Err(CliError::resource_with_help(
            format!(
                "{}: expected kind {}, found '{}'",
                path.display(),
                kinds.join(" or "),
                resource.kind
            ),
            "check the kind field of the file",
        ));
    }

    Ok(resource)
}

pub fn load_capability(path: &Path) -> Result<Capability> {
    load_resource(path, &[CAPABILITY_KIND, CLUSTER_CAPABILITY_KIND])
}

pub fn load_app(path: &Path) -> Result<App> {
    load_resource(path, &[APP_KIND])
}

pub fn load_dependency(path: &Path) -> Result<CapabilityDependency> {
    load_resource(path, &[DEPENDENCY_KIND])
}

/// Parse `--set` arguments into a single override layer
pub fn override_layers(set_values: &[String]) -> Result<Vec<IndexMap<String, capstan_core::Value>>> {
    if set_values.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![capstan_core::parse_overrides(set_values)?])
}
