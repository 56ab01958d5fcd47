//! Ownership metadata for reconciled objects
//!
//! Objects created for an app carry a controller owner reference back to the
//! app (so they are garbage collected with it) and the standard management
//! labels.

use capstan_core::App;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::warn;

/// Label naming the app an object belongs to
pub const APP_LABEL: &str = "capstan.dev/app";

/// Standard management label
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

pub const MANAGED_BY: &str = "capstan";

/// Controller owner reference pointing at the app
///
/// `None` when the app has no uid yet (it was never persisted).
pub fn owner_reference(app: &App) -> Option<OwnerReference> {
    let uid = app.metadata.uid.clone().filter(|uid| !uid.is_empty())?;
    Some(OwnerReference {
        api_version: app.api_version.clone(),
        kind: app.kind.clone(),
        name: app.name().to_string(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Labels stamped on every object reconciled for `app_name`
pub fn managed_labels(app_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
        (APP_LABEL.to_string(), app_name.to_string()),
    ])
}

/// Add or replace an owner reference, matching on uid
pub fn set_owner_reference(obj: &mut DynamicObject, owner: &OwnerReference) {
    let refs = obj.metadata.owner_references.get_or_insert_with(Vec::new);
    match refs.iter_mut().find(|r| r.uid == owner.uid) {
        Some(existing) => *existing = owner.clone(),
        None => refs.push(owner.clone()),
    }
}

/// Merge labels into the object, overwriting existing keys
pub fn merge_labels(obj: &mut DynamicObject, labels: &BTreeMap<String, String>) {
    if labels.is_empty() {
        return;
    }
    obj.metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
}

/// Put an object without a namespace into `namespace`
///
/// Only call this for namespaced kinds; cluster-scoped objects must stay
/// without one.
pub fn place_in_namespace(obj: &mut DynamicObject, namespace: Option<&str>) {
    let missing = obj.metadata.namespace.as_deref().is_none_or(str::is_empty);
    if let (true, Some(ns)) = (missing, namespace.filter(|ns| !ns.is_empty())) {
        obj.metadata.namespace = Some(ns.to_string());
    }
}

/// Stamp an object about to be written for an app
///
/// Labels are always merged. The owner reference is only set on objects in
/// the app's own namespace, since owner references cannot cross namespaces.
pub fn stamp(
    obj: &mut DynamicObject,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
    app_namespace: Option<&str>,
) {
    merge_labels(obj, labels);

    let Some(owner) = owner else {
        return;
    };
    let namespace = obj.metadata.namespace.clone().filter(|ns| !ns.is_empty());
    match namespace {
        Some(ns) if Some(ns.as_str()) == app_namespace => set_owner_reference(obj, owner),
        Some(ns) => warn!(
            app = %owner.name,
            namespace = %ns,
            name = obj.metadata.name.as_deref().unwrap_or(""),
            "object is outside the app namespace, not setting an owner reference"
        ),
        None => {}
    }
}

/// Merge `desired` into `live`
///
/// Objects merge key by key. Lists of the same length merge item by item, so
/// fields the server fills in inside list items survive. Anything else is
/// replaced.
fn merge_json(live: &mut JsonValue, desired: &JsonValue) {
    match (live, desired) {
        (JsonValue::Object(live), JsonValue::Object(desired)) => {
            for (field, value) in desired {
                match live.get_mut(field) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        live.insert(field.clone(), value.clone());
                    }
                }
            }
        }
        (JsonValue::Array(live), JsonValue::Array(desired)) => {
            if live.len() == desired.len() {
                for (item, value) in live.iter_mut().zip(desired) {
                    merge_json(item, value);
                }
            } else {
                *live = desired.clone();
            }
        }
        (live, desired) => *live = desired.clone(),
    }
}

/// Overlay desired state onto a live object
///
/// The desired body is merged into the live one; labels, annotations and
/// owner references are merged too. Fields the server populated and the
/// desired object does not mention (defaults, status, resourceVersion) are
/// kept, so overlaying the same desired state onto a defaulted live object is
/// a no-op.
pub fn overlay(live: &mut DynamicObject, desired: &DynamicObject) {
    if !desired.data.is_null() {
        merge_json(&mut live.data, &desired.data);
    }

    if let Some(labels) = &desired.metadata.labels {
        merge_labels(live, labels);
    }

    if let Some(annotations) = &desired.metadata.annotations {
        live.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    for owner in desired.metadata.owner_references.iter().flatten() {
        set_owner_reference(live, owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object_from_json;
    use capstan_core::{AppSpec, CapReference, ResourceMeta, APP_KIND};
    use serde_json::json;

    fn app(uid: Option<&str>) -> App {
        App::new(
            APP_KIND,
            ResourceMeta {
                name: "shop".into(),
                namespace: Some("team-a".into()),
                uid: uid.map(str::to_string),
            },
            AppSpec {
                cap_ref: CapReference {
                    name: "web".into(),
                    namespace: None,
                },
                values: vec![],
            },
        )
    }

    fn deployment(replicas: i64) -> DynamicObject {
        object_from_json(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "shop", "namespace": "team-a", "labels": {"tier": "web"}},
            "spec": {"replicas": replicas}
        }))
        .unwrap()
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        assert!(owner_reference(&app(None)).is_none());

        let owner = owner_reference(&app(Some("1234"))).unwrap();
        assert_eq!(owner.kind, "App");
        assert_eq!(owner.api_version, "capstan.dev/v1beta1");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn test_set_owner_reference_is_idempotent() {
        let owner = owner_reference(&app(Some("1234"))).unwrap();
        let mut obj = deployment(1);

        set_owner_reference(&mut obj, &owner);
        set_owner_reference(&mut obj, &owner);

        assert_eq!(obj.metadata.owner_references.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_overlay_updates_body_and_keeps_server_fields() {
        let mut live = deployment(1);
        live.data["status"] = json!({"readyReplicas": 1});
        live.metadata.resource_version = Some("7".into());
        live.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert("extra".into(), "x".into());

        overlay(&mut live, &deployment(3));

        assert_eq!(live.data["spec"]["replicas"], 3);
        assert_eq!(live.data["status"]["readyReplicas"], 1);
        assert_eq!(live.metadata.resource_version.as_deref(), Some("7"));
        let labels = live.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get("tier").map(String::as_str), Some("web"));
        assert_eq!(labels.get("extra").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_overlay_twice_is_stable() {
        let desired = deployment(2);
        let mut once = deployment(1);
        overlay(&mut once, &desired);
        let mut twice = once.clone();
        overlay(&mut twice, &desired);

        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn test_overlay_keeps_server_defaults() {
        let mut live = object_from_json(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "shop", "namespace": "team-a", "labels": {"tier": "web"}},
            "spec": {
                "replicas": 2,
                "revisionHistoryLimit": 10,
                "template": {"spec": {
                    "dnsPolicy": "ClusterFirst",
                    "containers": [{"name": "web", "image": "nginx:1.27", "imagePullPolicy": "IfNotPresent"}]
                }}
            }
        }))
        .unwrap();
        let before = serde_json::to_value(&live).unwrap();

        let desired = object_from_json(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "shop", "namespace": "team-a", "labels": {"tier": "web"}},
            "spec": {
                "replicas": 2,
                "template": {"spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]}}
            }
        }))
        .unwrap();
        overlay(&mut live, &desired);

        assert_eq!(serde_json::to_value(&live).unwrap(), before);
    }

    #[test]
    fn test_overlay_replaces_lists_of_other_length() {
        let mut live = object_from_json(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web", "namespace": "team-a"},
            "spec": {"ports": [{"port": 80, "protocol": "TCP"}, {"port": 443, "protocol": "TCP"}]}
        }))
        .unwrap();
        let desired = object_from_json(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web", "namespace": "team-a"},
            "spec": {"ports": [{"port": 8080}]}
        }))
        .unwrap();

        overlay(&mut live, &desired);

        assert_eq!(live.data["spec"]["ports"], json!([{"port": 8080}]));
    }

    #[test]
    fn test_stamp_skips_owner_without_namespace() {
        let owner = owner_reference(&app(Some("1234"))).unwrap();
        let labels = managed_labels("shop");

        let mut namespaced = deployment(1);
        stamp(&mut namespaced, &labels, Some(&owner), Some("team-a"));
        assert!(namespaced.metadata.owner_references.is_some());

        let mut cluster = deployment(1);
        cluster.metadata.namespace = None;
        stamp(&mut cluster, &labels, Some(&owner), Some("team-a"));
        assert!(cluster.metadata.owner_references.is_none());
        assert_eq!(cluster.metadata.labels.unwrap().len(), 3);
    }

    #[test]
    fn test_stamp_skips_owner_in_other_namespace() {
        let owner = owner_reference(&app(Some("1234"))).unwrap();
        let labels = managed_labels("shop");

        let mut elsewhere = deployment(1);
        elsewhere.metadata.namespace = Some("infra".into());
        stamp(&mut elsewhere, &labels, Some(&owner), Some("team-a"));

        assert!(elsewhere.metadata.owner_references.is_none());
        let stamped = elsewhere.metadata.labels.unwrap();
        assert_eq!(stamped.get(APP_LABEL).map(String::as_str), Some("shop"));
    }

    #[test]
    fn test_place_in_namespace_only_fills_missing() {
        let mut obj = deployment(1);
        obj.metadata.namespace = None;
        place_in_namespace(&mut obj, Some("team-a"));
        assert_eq!(obj.metadata.namespace.as_deref(), Some("team-a"));

        place_in_namespace(&mut obj, Some("other"));
        assert_eq!(obj.metadata.namespace.as_deref(), Some("team-a"));

        let mut bare = deployment(1);
        bare.metadata.namespace = None;
        place_in_namespace(&mut bare, None);
        assert!(bare.metadata.namespace.is_none());
    }

    #[test]
    fn test_managed_labels() {
        let labels = managed_labels("shop");
        assert_eq!(labels.get(MANAGED_BY_LABEL).map(String::as_str), Some("capstan"));
        assert_eq!(labels.get(APP_LABEL).map(String::as_str), Some("shop"));
    }
}
