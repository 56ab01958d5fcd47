//! Capability outputs: values read back from live objects after
//! materialization and published for consumers of the app

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use capstan_core::{App, OutputSpec};
use kube::api::DynamicObject;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;

use crate::error::{KubeError, Result};
use crate::ownership::{managed_labels, overlay, owner_reference, set_owner_reference};
use crate::store::{ObjectKey, ObjectStore, UpsertOutcome, object_from_json};

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Field(&'a str),
    Index(usize),
}

/// Split a field path like `$.status.ingress[0].ip` into segments
///
/// A leading `$` and/or `.` is optional. Returns `None` for malformed paths
/// (empty field names, unterminated or non-numeric brackets).
fn parse_field_path(path: &str) -> Option<Vec<Segment<'_>>> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);

    let mut segments = Vec::new();
    if path.is_empty() {
        return Some(segments);
    }

    for part in path.split('.') {
        let (field, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if field.is_empty() && rest.is_empty() {
            return None;
        }
        if !field.is_empty() {
            segments.push(Segment::Field(field));
        }
        while !rest.is_empty() {
            let close = rest.find(']')?;
            let index = rest.get(1..close)?.trim().parse().ok()?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return None;
            }
        }
    }

    Some(segments)
}

/// Evaluate a field path against an object body
pub fn lookup_field<'a>(body: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    parse_field_path(path)?
        .into_iter()
        .try_fold(body, |node, segment| match segment {
            Segment::Field(name) => node.get(name),
            Segment::Index(i) => node.get(i),
        })
}

/// Key of the object an output reads from; a missing namespace means the app's
fn output_key(spec: &OutputSpec, default_namespace: Option<&str>) -> ObjectKey {
    let obj = &spec.object_ref;
    ObjectKey::new(
        &obj.api_version,
        &obj.kind,
        obj.namespace.as_deref().or(default_namespace),
        &obj.name,
    )
}

/// Read every output; the first failure discards all results
pub async fn extract_outputs(
    specs: &[OutputSpec],
    default_namespace: Option<&str>,
    store: &dyn ObjectStore,
) -> Result<BTreeMap<String, String>> {
    let mut outputs = BTreeMap::new();

    for spec in specs {
        let key = output_key(spec, default_namespace);
        let obj = store.get(&key).await?;
        let body = serde_json::to_value(&obj)?;

        let value = lookup_field(&body, &spec.field_path).ok_or_else(|| {
            KubeError::OutputFieldNotFound {
                target_id: spec.target_id.clone(),
                field_path: spec.field_path.clone(),
            }
        })?;

        let JsonValue::String(s) = value else {
            return Err(KubeError::OutputNotString {
                target_id: spec.target_id.clone(),
            });
        };

        outputs.insert(spec.target_id.clone(), s.clone());
    }

    Ok(outputs)
}

/// Secret holding an app's outputs, base64-encoded in `data`
pub fn outputs_secret(app: &App, outputs: &BTreeMap<String, String>) -> Result<DynamicObject> {
    let data: serde_json::Map<String, JsonValue> = outputs
        .iter()
        .map(|(k, v)| (k.clone(), JsonValue::String(STANDARD.encode(v))))
        .collect();

    let mut secret = object_from_json(json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": app.name(),
            "namespace": app.namespace(),
            "labels": managed_labels(app.name()),
        },
        "type": "Opaque",
        "data": data,
    }))?;

    if let Some(owner) = owner_reference(app) {
        set_owner_reference(&mut secret, &owner);
    }
    Ok(secret)
}

/// Upsert the outputs Secret for an app
pub async fn publish_outputs(
    app: &App,
    outputs: &BTreeMap<String, String>,
    store: &dyn ObjectStore,
) -> Result<UpsertOutcome> {
    let secret = outputs_secret(app, outputs)?;
    store
        .upsert(&secret, &|live: &mut DynamicObject| {
            overlay(live, &secret);
            live.data["data"] = secret.data["data"].clone();
        })
        .await
}

/// Decode an outputs Secret back into plain strings
pub fn decode_outputs(secret: &DynamicObject) -> Result<BTreeMap<String, String>> {
    let mut outputs = BTreeMap::new();
    let Some(data) = secret.data.get("data").and_then(JsonValue::as_object) else {
        return Ok(outputs);
    };

    for (key, value) in data {
        let encoded = value.as_str().unwrap_or_default();
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| KubeError::Serialization(format!("output '{key}': {e}")))?;
        let decoded = String::from_utf8(bytes)
            .map_err(|e| KubeError::Serialization(format!("output '{key}': {e}")))?;
        outputs.insert(key.clone(), decoded);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockObjectStore;
    use capstan_core::{AppSpec, CapReference, ObjectRef, ResourceMeta, APP_KIND};

    fn service() -> DynamicObject {
        object_from_json(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "db", "namespace": "shop"},
            "spec": {"ports": [{"port": 5432}]},
            "status": {"loadBalancer": {"ingress": [{"ip": "10.0.0.7"}]}}
        }))
        .unwrap()
    }

    fn output(target: &str, name: &str, path: &str) -> OutputSpec {
        OutputSpec {
            target_id: target.into(),
            object_ref: ObjectRef {
                api_version: "v1".into(),
                kind: "Service".into(),
                name: name.into(),
                namespace: None,
            },
            field_path: path.into(),
        }
    }

    fn app() -> App {
        App::new(
            APP_KIND,
            ResourceMeta {
                name: "shop".into(),
                namespace: Some("shop".into()),
                uid: Some("uid-1".into()),
            },
            AppSpec {
                cap_ref: CapReference {
                    name: "db".into(),
                    namespace: None,
                },
                values: vec![],
            },
        )
    }

    #[test]
    fn test_lookup_field_forms() {
        let body = json!({"status": {"ingress": [{"ip": "1.2.3.4"}]}, "data": {"host": "db"}});

        assert_eq!(lookup_field(&body, ".status.ingress[0].ip"), Some(&json!("1.2.3.4")));
        assert_eq!(lookup_field(&body, "$.status.ingress[0].ip"), Some(&json!("1.2.3.4")));
        assert_eq!(lookup_field(&body, "data.host"), Some(&json!("db")));
        assert_eq!(lookup_field(&body, "status.ingress[1].ip"), None);
        assert_eq!(lookup_field(&body, "status..ingress"), None);
        assert_eq!(lookup_field(&body, "status.ingress[x]"), None);
        assert_eq!(lookup_field(&body, "$"), Some(&body));
    }

    #[tokio::test]
    async fn test_extract_outputs() {
        let store = MockObjectStore::with_objects(vec![service()]).unwrap();
        let specs = vec![
            output("db.ip", "db", ".status.loadBalancer.ingress[0].ip"),
            output("db.name", "db", "metadata.name"),
        ];

        let outputs = extract_outputs(&specs, Some("shop"), &store).await.unwrap();

        assert_eq!(outputs.get("db.ip").map(String::as_str), Some("10.0.0.7"));
        assert_eq!(outputs.get("db.name").map(String::as_str), Some("db"));
    }

    #[tokio::test]
    async fn test_extract_outputs_all_or_nothing() {
        let store = MockObjectStore::with_objects(vec![service()]).unwrap();

        let specs = vec![
            output("db.name", "db", "metadata.name"),
            output("db.port", "db", "spec.ports[0].port"),
        ];
        let err = extract_outputs(&specs, Some("shop"), &store).await.unwrap_err();
        assert!(matches!(err, KubeError::OutputNotString { target_id } if target_id == "db.port"));

        let specs = vec![
            output("db.name", "db", "metadata.name"),
            output("db.host", "db", "status.hostname"),
        ];
        let err = extract_outputs(&specs, Some("shop"), &store).await.unwrap_err();
        assert!(matches!(
            err,
            KubeError::OutputFieldNotFound { target_id, field_path }
                if target_id == "db.host" && field_path == "status.hostname"
        ));
    }

    #[tokio::test]
    async fn test_extract_outputs_missing_object() {
        let store = MockObjectStore::new();
        let err = extract_outputs(&[output("x", "db", "metadata.name")], Some("shop"), &store)
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_publish_outputs_upserts_secret() {
        let store = MockObjectStore::new();
        let outputs = BTreeMap::from([("db.ip".to_string(), "10.0.0.7".to_string())]);

        let first = publish_outputs(&app(), &outputs, &store).await.unwrap();
        let second = publish_outputs(&app(), &outputs, &store).await.unwrap();
        assert_eq!(first, UpsertOutcome::Created);
        assert_eq!(second, UpsertOutcome::Unchanged);

        let key = ObjectKey::new("v1", "Secret", Some("shop"), "shop");
        let secret = store.object(&key).unwrap();
        assert_eq!(secret.data["data"]["db.ip"], "MTAuMC4wLjc=");
        assert_eq!(decode_outputs(&secret).unwrap(), outputs);

        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners[0].uid, "uid-1");
    }

    #[tokio::test]
    async fn test_publish_outputs_updates_changed_values() {
        let store = MockObjectStore::new();
        let before = BTreeMap::from([("db.ip".to_string(), "10.0.0.7".to_string())]);
        let after = BTreeMap::from([("db.ip".to_string(), "10.0.0.8".to_string())]);

        publish_outputs(&app(), &before, &store).await.unwrap();
        let outcome = publish_outputs(&app(), &after, &store).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
    }

    #[tokio::test]
    async fn test_publish_outputs_drops_removed_keys() {
        let store = MockObjectStore::new();
        let before = BTreeMap::from([
            ("db.ip".to_string(), "10.0.0.7".to_string()),
            ("db.name".to_string(), "db".to_string()),
        ]);
        let after = BTreeMap::from([("db.ip".to_string(), "10.0.0.7".to_string())]);

        publish_outputs(&app(), &before, &store).await.unwrap();
        publish_outputs(&app(), &after, &store).await.unwrap();

        let key = ObjectKey::new("v1", "Secret", Some("shop"), "shop");
        let secret = store.object(&key).unwrap();
        assert_eq!(decode_outputs(&secret).unwrap(), after);
    }
}
