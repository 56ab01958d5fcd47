//! Key-path expansion for chart value trees
//!
//! Chart values are nested, while resolved values are flat. A key such as
//! `image.tag` becomes `{image: {tag: ...}}`. Entries are applied in order and
//! a later entry overwrites an earlier one it collides with.

use capstan_core::{ResolvedValueSet, Value};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

/// Separator between key segments
pub const KEY_SEPARATOR: char = '.';

/// Insert `value` at the dotted `key`, creating intermediate objects
///
/// The key is split at its first separator; the head becomes a nesting level
/// and the remainder is inserted recursively. A leaf standing where a nesting
/// level is needed is replaced by an object.
fn insert_path(tree: &mut Map<String, JsonValue>, key: &str, value: JsonValue) {
    match key.split_once(KEY_SEPARATOR) {
        None => {
            tree.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = tree
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(child) = slot {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Expand ordered `(key, value)` pairs into a nested object
pub fn expand_pairs<'a, I>(pairs: I) -> JsonValue
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut tree = Map::new();
    for (key, value) in pairs {
        insert_path(&mut tree, key, value.to_json());
    }
    JsonValue::Object(tree)
}

/// Expand a flat map
pub fn expand(flat: &IndexMap<String, Value>) -> JsonValue {
    expand_pairs(flat.iter().map(|(k, v)| (k.as_str(), v)))
}

/// Expand a resolved value set, honoring its write order
pub fn expand_values(values: &ResolvedValueSet) -> JsonValue {
    expand_pairs(values.iter().map(|e| (e.target_id.as_str(), &e.value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_expand_nested_paths() {
        let tree = expand(&flat(&[
            ("a.b.c", Value::Int(1)),
            ("a.b.d", Value::Int(2)),
            ("e", Value::Int(3)),
        ]));
        assert_eq!(tree, json!({"a": {"b": {"c": 1, "d": 2}}, "e": 3}));
    }

    #[test]
    fn test_plain_keys_copy_through() {
        let tree = expand(&flat(&[
            ("replicas", Value::Int(2)),
            ("hosts", Value::StringList(vec!["a".into()])),
        ]));
        assert_eq!(tree, json!({"replicas": 2, "hosts": ["a"]}));
    }

    #[test]
    fn test_later_leaf_replaces_subtree() {
        let mut values = ResolvedValueSet::new();
        values.push("image.tag", Value::from("1.0"), false);
        values.push("image", Value::from("nginx:latest"), false);

        assert_eq!(expand_values(&values), json!({"image": "nginx:latest"}));
    }

    #[test]
    fn test_later_subtree_replaces_leaf() {
        let mut values = ResolvedValueSet::new();
        values.push("image", Value::from("nginx:latest"), false);
        values.push("image.tag", Value::from("1.0"), false);

        assert_eq!(expand_values(&values), json!({"image": {"tag": "1.0"}}));
    }

    #[test]
    fn test_map_values_are_inserted_whole() {
        let tree = expand(&flat(&[(
            "resources.limits",
            Value::from(json!({"cpu": "500m", "memory": "1Gi"})),
        )]));
        assert_eq!(
            tree,
            json!({"resources": {"limits": {"cpu": "500m", "memory": "1Gi"}}})
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(expand(&IndexMap::new()), json!({}));
    }
}
