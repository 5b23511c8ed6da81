//! Merger - combine two documents
//!
//! - [`merge`] fills gaps in place: shared mappings are recursed into,
//!   shared scalars are never overwritten.
//! - [`update_with`] returns a new document, with per-key list strategies
//!   (`append_to`, `append_to_set`, `merge_to`, `remove_from`), selective
//!   overwriting and optional flattening of both sides.
//! - [`merge_with`] is `update_with` without overwriting.

pub mod options;
pub mod strategy;
pub mod update;

pub use options::{KeySelection, UpdateOptions};
pub use strategy::{ListStrategy, StrategyTable};
pub use update::Merger;

use crate::error::Result;
use crate::path::{flatten, path_starts_with, unflatten};
use crate::types::{Document, FlatMap};
use serde_json::Value;

/// Deep-merge `other` into `target` in place, never overwriting.
pub fn merge(target: &mut Document, other: &Document) {
    for (key, incoming) in other {
        match target.get_mut(key) {
            Some(Value::Object(existing)) => {
                if let Value::Object(incoming) = incoming {
                    merge(existing, incoming);
                }
            }
            Some(_) => {}
            None => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Overwrite `target` with every leaf of `source`, keeping the rest.
pub fn deep_update(target: &mut Document, source: &Document) -> Result<()> {
    let mut flat = flatten(target, true);
    for (key, value) in flatten(source, true) {
        clear_shadowed(&mut flat, &key);
        flat.insert(key, value);
    }
    *target = unflatten(&flat)?;
    Ok(())
}

/// Whether a flat key other than `key` is an ancestor or descendant of it.
///
/// Empty-map ancestors are placeholders that `key` may descend into.
pub(crate) fn is_shadowed(flat: &FlatMap, key: &str) -> bool {
    flat.iter().any(|(other, value)| {
        other != key && overlaps(other, key) && !(path_starts_with(key, other) && is_empty_map(value))
    })
}

fn is_empty_map(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

/// Drop flat keys that would conflict with writing `key`.
pub(crate) fn clear_shadowed(flat: &mut FlatMap, key: &str) {
    flat.retain(|other, _| other == key || !overlaps(other, key));
}

fn overlaps(a: &str, b: &str) -> bool {
    path_starts_with(a, b) || path_starts_with(b, a)
}

/// [`Merger::update_with`] with the default error policy.
pub fn update_with(doc: &Document, other: &Document, options: &UpdateOptions) -> Result<Document> {
    Merger::new().update_with(doc, other, options)
}

/// [`Merger::merge_with`] with the default error policy.
pub fn merge_with(doc: &Document, other: &Document) -> Result<Document> {
    Merger::new().merge_with(doc, other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        crate::types::document_from_value(value).unwrap()
    }

    #[test]
    fn test_merge_fills_gaps_only() {
        let mut a = doc(json!({"a": 1, "n": {"x": 1}, "s": "keep"}));
        let b = doc(json!({"a": 2, "n": {"x": 2, "y": 2}, "s": {"no": 1}, "new": [1]}));
        merge(&mut a, &b);
        assert_eq!(
            Value::Object(a),
            json!({"a": 1, "n": {"x": 1, "y": 2}, "s": "keep", "new": [1]})
        );
    }

    #[test]
    fn test_deep_update() {
        let mut a = doc(json!({"a": {"b": 1, "c": 1}, "l": [1]}));
        deep_update(&mut a, &doc(json!({"a": {"c": 2}, "l": [2, 3]}))).unwrap();
        assert_eq!(Value::Object(a), json!({"a": {"b": 1, "c": 2}, "l": [2, 3]}));

        let mut a = doc(json!({"a": {"b": 1}}));
        deep_update(&mut a, &doc(json!({"a": 5}))).unwrap();
        assert_eq!(Value::Object(a), json!({"a": 5}));
    }

    #[test]
    fn test_free_functions() {
        let a = doc(json!({"a": 1}));
        let b = doc(json!({"a": 2}));
        assert_eq!(update_with(&a, &b, &UpdateOptions::default()).unwrap()["a"], json!(2));
        assert_eq!(merge_with(&a, &b).unwrap()["a"], json!(1));
    }
}
