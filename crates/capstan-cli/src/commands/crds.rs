//! Crds command - print the CustomResourceDefinitions capstan reads

use capstan_core::{
    API_GROUP, APP_KIND, CAPABILITY_KIND, CLUSTER_CAPABILITY_KIND, DEPENDENCY_KIND,
};
use serde_json::{Value as JsonValue, json};

use crate::error::{CliError, Result};

/// Version served by every definition
const VERSION: &str = "v1beta1";

struct Definition {
    kind: &'static str,
    plural: &'static str,
    scope: &'static str,
    short_names: &'static [&'static str],
}

const DEFINITIONS: &[Definition] = &[
    Definition {
        kind: CAPABILITY_KIND,
        plural: "capabilities",
        scope: "Namespaced",
        short_names: &["cap"],
    },
    Definition {
        kind: CLUSTER_CAPABILITY_KIND,
        plural: "clustercapabilities",
        scope: "Cluster",
        short_names: &["ccap"],
    },
    Definition {
        kind: DEPENDENCY_KIND,
        plural: "capabilitydependencies",
        scope: "Namespaced",
        short_names: &["capdep"],
    },
    Definition {
        kind: APP_KIND,
        plural: "apps",
        scope: "Namespaced",
        short_names: &[],
    },
];

fn crd(def: &Definition) -> JsonValue {
    let mut names = json!({
        "kind": def.kind,
        "listKind": format!("{}List", def.kind),
        "plural": def.plural,
        "singular": def.kind.to_lowercase(),
    });
    if !def.short_names.is_empty() {
        names["shortNames"] = json!(def.short_names);
    }

    json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinition",
        "metadata": {
            "name": format!("{}.{}", def.plural, API_GROUP),
        },
        "spec": {
            "group": API_GROUP,
            "names": names,
            "scope": def.scope,
            "versions": [{
                "name": VERSION,
                "served": true,
                "storage": true,
                "schema": {
                    "openAPIV3Schema": {
                        "type": "object",
                        "properties": {
                            "spec": {
                                "type": "object",
                                "x-kubernetes-preserve-unknown-fields": true,
                            },
                            "status": {
                                "type": "object",
                                "x-kubernetes-preserve-unknown-fields": true,
                            },
                        },
                    },
                },
            }],
        },
    })
}

/// All definitions, in a stable order
pub fn definitions() -> Vec<JsonValue> {
    DEFINITIONS.iter().map(crd).collect()
}

pub fn run() -> Result<()> {
    for definition in definitions() {
        let yaml = serde_yaml::to_string(&definition)
            .map_err(|e| CliError::internal(format!("failed to serialize definition: {e}")))?;
        println!("---");
        println!("{}", yaml.trim_end());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_cover_every_kind() {
        let defs = definitions();
        let kinds: Vec<&str> = defs
            .iter()
            .map(|d| d["spec"]["names"]["kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec!["Capability", "ClusterCapability", "CapabilityDependency", "App"]
        );
    }

    #[test]
    fn test_definition_names_and_scope() {
        let defs = definitions();
        assert_eq!(defs[1]["metadata"]["name"], "clustercapabilities.capstan.dev");
        assert_eq!(defs[1]["spec"]["scope"], "Cluster");
        assert_eq!(defs[1]["spec"]["names"]["shortNames"], json!(["ccap"]));
        assert!(defs[3]["spec"]["names"].get("shortNames").is_none());
        assert_eq!(defs[3]["spec"]["versions"][0]["name"], "v1beta1");
    }
}
