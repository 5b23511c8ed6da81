use crate::path::SEPARATOR;
use crate::types::{Document, FlatMap};
use serde_json::{Map, Value};

/// Linearize a document into dotted paths.
///
/// Mappings are always recursed into, except empty ones which are kept as
/// leaves so they survive a round trip. Sequences are recursed into with
/// their positions as path segments unless `keep_lists` is set, in which
/// case the whole sequence is stored as a single leaf.
pub fn flatten(doc: &Document, keep_lists: bool) -> FlatMap {
    let mut out = Map::new();
    for (key, value) in doc {
        flatten_into(value, key, keep_lists, &mut out);
    }
    out
}

/// Flatten the children of a single value.
///
/// Returns `None` for scalars, and for sequences when `keep_lists` is set,
/// since those have no children to expand.
pub fn flatten_value(value: &Value, keep_lists: bool) -> Option<FlatMap> {
    match value {
        Value::Object(map) => Some(flatten(map, keep_lists)),
        Value::Array(items) if !keep_lists => {
            let mut out = Map::new();
            for (idx, item) in items.iter().enumerate() {
                flatten_into(item, &idx.to_string(), keep_lists, &mut out);
            }
            Some(out)
        }
        _ => None,
    }
}

/// Flatten only the named top-level keys, splicing their leaves into the
/// document under `key.` prefixes. Other keys are copied unchanged.
pub fn flatten_keys<S: AsRef<str>>(doc: &Document, keys: &[S], keep_lists: bool) -> Document {
    let mut out = Map::new();
    for (key, value) in doc {
        let named = keys.iter().any(|k| k.as_ref() == key);
        if named {
            flatten_into(value, key, keep_lists, &mut out);
        } else {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

/// Join a base path and a key; an empty base yields the bare key.
pub fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}{SEPARATOR}{key}")
    }
}

fn flatten_into(value: &Value, base: &str, keep_lists: bool, out: &mut FlatMap) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, &join_path(base, key), keep_lists, out);
            }
        }
        Value::Array(items) if !keep_lists && !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                flatten_into(child, &join_path(base, &idx.to_string()), keep_lists, out);
            }
        }
        leaf => {
            out.insert(base.to_string(), leaf.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        crate::types::document_from_value(value).unwrap()
    }

    #[test]
    fn test_flatten_nested_maps() {
        let flat = flatten(&doc(json!({"a": {"b": {"c": 1}}, "d": 2})), true);
        assert_eq!(Value::Object(flat), json!({"a.b.c": 1, "d": 2}));
    }

    #[test]
    fn test_keep_lists_stores_sequences_whole() {
        let flat = flatten(&doc(json!({"a": [1, {"b": 2}]})), true);
        assert_eq!(Value::Object(flat), json!({"a": [1, {"b": 2}]}));
    }

    #[test]
    fn test_lists_expand_to_indices() {
        let flat = flatten(&doc(json!({"a": [1, {"b": 2}, []]})), false);
        assert_eq!(
            Value::Object(flat),
            json!({"a.0": 1, "a.1.b": 2, "a.2": []})
        );
    }

    #[test]
    fn test_empty_map_is_a_leaf() {
        let flat = flatten(&doc(json!({"a": {}, "b": {"c": {}}})), true);
        assert_eq!(Value::Object(flat), json!({"a": {}, "b.c": {}}));
    }

    #[test]
    fn test_flatten_value_on_scalar() {
        assert!(flatten_value(&json!(3), false).is_none());
        assert!(flatten_value(&json!([1]), true).is_none());
        assert_eq!(
            flatten_value(&json!([1, 2]), false).map(Value::Object),
            Some(json!({"0": 1, "1": 2}))
        );
    }

    #[test]
    fn test_flatten_keys_only_touches_named() {
        let out = flatten_keys(&doc(json!({"a": {"x": 1}, "b": {"y": 2}})), &["a"], true);
        assert_eq!(Value::Object(out), json!({"a.x": 1, "b": {"y": 2}}));
    }
}
