use crate::error::{DocError, Result};
use crate::merge::{deep_update, UpdateOptions};
use crate::transform::sort_items;
use crate::types::JsonType;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// How a list-valued key combines the existing and incoming values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStrategy {
    /// Concatenate, then optionally sort by `[+-]field`.
    Append { sort: Option<String> },
    /// Concatenate, then drop duplicates (by `field` when given).
    AppendUnique { key: Option<String> },
    /// Deep-update existing elements that share `key` with an incoming one.
    MergeByKey { key: String },
    /// Drop existing elements equal to (or sharing `key` with) an incoming one.
    RemoveMatching { key: Option<String> },
}

impl ListStrategy {
    /// Combine `existing` (absent means empty) with `incoming` for `list`.
    ///
    /// An incoming scalar is treated as a one-element list.
    pub fn apply(&self, list: &str, existing: Option<&Value>, incoming: &Value) -> Result<Value> {
        let mut items = match existing {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(DocError::TypeMismatch {
                    path: list.to_string(),
                    expected: "array",
                    actual: JsonType::from_value(other).as_str(),
                })
            }
        };
        let incoming = match incoming {
            Value::Array(values) => values.clone(),
            other => vec![other.clone()],
        };

        let items = match self {
            ListStrategy::Append { sort } => {
                items.extend(incoming);
                match sort {
                    Some(by) => sort_items(items, by),
                    None => items,
                }
            }
            ListStrategy::AppendUnique { key } => {
                items.extend(incoming);
                match key {
                    Some(key) => unique_by(items, key),
                    None => unique_values(items, list)?,
                }
            }
            ListStrategy::MergeByKey { key } => merge_by_key(items, incoming, key, list)?,
            ListStrategy::RemoveMatching { key } => {
                items.retain(|item| !incoming.iter().any(|other| same_element(item, other, key.as_deref())));
                items
            }
        };
        Ok(Value::Array(items))
    }
}

/// Iterate from the end so later elements win; elements without the key
/// are always kept. A `+`/`-` prefix on the key also sorts the result.
fn unique_by(items: Vec<Value>, set_key: &str) -> Vec<Value> {
    let name = set_key.trim_start_matches(['+', '-']);
    let mut seen: Vec<Value> = Vec::new();
    let mut kept = Vec::new();
    for item in items.into_iter().rev() {
        let Some(id) = item.get(name).cloned() else {
            kept.push(item);
            continue;
        };
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        kept.push(item);
    }
    kept.reverse();

    if name.len() != set_key.len() {
        kept = sort_items(kept, set_key);
    }
    kept
}

fn unique_values(items: Vec<Value>, list: &str) -> Result<Vec<Value>> {
    let mut kept: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if item.is_object() || item.is_array() {
            return Err(DocError::Unhashable(list.to_string()));
        }
        if !kept.contains(&item) {
            kept.push(item);
        }
    }
    Ok(kept)
}

fn merge_by_key(mut items: Vec<Value>, incoming: Vec<Value>, key: &str, list: &str) -> Result<Vec<Value>> {
    for update in &incoming {
        let (Some(id), Value::Object(source)) = (update.get(key), update) else {
            warn!(list, key, "merge_to element without the key ignored");
            continue;
        };
        let mut matched = false;
        for item in items.iter_mut() {
            if item.get(key) != Some(id) {
                continue;
            }
            if let Value::Object(target) = item {
                deep_update(target, source)?;
                matched = true;
            }
        }
        if !matched {
            warn!(list, key, id = %id, "merge_to element matched nothing");
        }
    }
    Ok(items)
}

fn same_element(item: &Value, other: &Value, key: Option<&str>) -> bool {
    match key {
        Some(key) => match (item.get(key), other.get(key)) {
            (Some(a), Some(b)) => a == b,
            _ => item == other,
        },
        None => item == other,
    }
}

/// Per-key list strategies collected from [`UpdateOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyTable {
    strategies: BTreeMap<String, ListStrategy>,
}

impl StrategyTable {
    pub fn from_options(options: &UpdateOptions) -> Result<Self> {
        let mut table = StrategyTable::default();
        for directive in &options.append_to {
            let (key, sub) = split_directive(directive);
            table.insert(key, ListStrategy::Append { sort: sub })?;
        }
        for directive in &options.append_to_set {
            let (key, sub) = split_directive(directive);
            table.insert(key, ListStrategy::AppendUnique { key: sub })?;
        }
        for directive in &options.merge_to {
            let (key, sub) = split_directive(directive);
            let sub = sub.ok_or_else(|| DocError::spec(directive, "merge_to needs a sub-key"))?;
            table.insert(key, ListStrategy::MergeByKey { key: sub })?;
        }
        for directive in &options.remove_from {
            let (key, sub) = split_directive(directive);
            table.insert(key, ListStrategy::RemoveMatching { key: sub })?;
        }
        Ok(table)
    }

    fn insert(&mut self, key: &str, strategy: ListStrategy) -> Result<()> {
        if self.strategies.contains_key(key) {
            return Err(DocError::ConflictingDirectives(format!(
                "`{key}` appears in more than one list directive"
            )));
        }
        self.strategies.insert(key.to_string(), strategy);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ListStrategy> {
        self.strategies.get(key)
    }
}

fn split_directive(directive: &str) -> (&str, Option<String>) {
    match directive.split_once(':') {
        Some((key, sub)) if !sub.trim().is_empty() => (key.trim(), Some(sub.trim().to_string())),
        Some((key, _)) => (key.trim(), None),
        None => (directive.trim(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_sorted() {
        let strategy = ListStrategy::Append {
            sort: Some("-n".into()),
        };
        let out = strategy
            .apply("l", Some(&json!([{"n": 1}])), &json!([{"n": 3}, {"n": 2}]))
            .unwrap();
        assert_eq!(out, json!([{"n": 3}, {"n": 2}, {"n": 1}]));
        let out = ListStrategy::Append { sort: None }.apply("l", None, &json!(5)).unwrap();
        assert_eq!(out, json!([5]));
    }

    #[test]
    fn test_append_unique_by_key_later_wins() {
        let strategy = ListStrategy::AppendUnique {
            key: Some("b".into()),
        };
        let out = strategy
            .apply(
                "aaa",
                Some(&json!([{"b": 1, "c": 2}, {"x": 0}])),
                &json!([{"b": 1, "c": 3}, {"b": 2, "c": 33}, {"x": 0}]),
            )
            .unwrap();
        assert_eq!(
            out,
            json!([{"x": 0}, {"b": 1, "c": 3}, {"b": 2, "c": 33}, {"x": 0}])
        );
    }

    #[test]
    fn test_append_unique_sorted() {
        let strategy = ListStrategy::AppendUnique {
            key: Some("-b".into()),
        };
        let out = strategy
            .apply("l", Some(&json!([{"b": 1}])), &json!([{"b": 2}, {"b": 1, "new": true}]))
            .unwrap();
        assert_eq!(out, json!([{"b": 2}, {"b": 1, "new": true}]));
    }

    #[test]
    fn test_append_unique_values() {
        let strategy = ListStrategy::AppendUnique { key: None };
        assert_eq!(
            strategy.apply("l", Some(&json!([1, 2])), &json!([2, 3])).unwrap(),
            json!([1, 2, 3])
        );
        let err = strategy.apply("l", None, &json!([{"a": 1}])).unwrap_err();
        assert!(matches!(err, DocError::Unhashable(_)));
    }

    #[test]
    fn test_merge_by_key() {
        let strategy = ListStrategy::MergeByKey { key: "id".into() };
        let out = strategy
            .apply(
                "l",
                Some(&json!([{"id": 1, "v": {"a": 1, "b": 1}}, {"id": 2}])),
                &json!([{"id": 1, "v": {"b": 2}}, {"id": 3, "v": 0}]),
            )
            .unwrap();
        assert_eq!(out, json!([{"id": 1, "v": {"a": 1, "b": 2}}, {"id": 2}]));
    }

    #[test]
    fn test_remove_matching() {
        let by_value = ListStrategy::RemoveMatching { key: None };
        assert_eq!(
            by_value.apply("l", Some(&json!([1, 2, 3])), &json!([2])).unwrap(),
            json!([1, 3])
        );
        let by_key = ListStrategy::RemoveMatching {
            key: Some("id".into()),
        };
        assert_eq!(
            by_key
                .apply("l", Some(&json!([{"id": 1, "x": 1}, {"id": 2}])), &json!({"id": 1}))
                .unwrap(),
            json!([{"id": 2}])
        );
    }

    #[test]
    fn test_existing_must_be_a_list() {
        let err = ListStrategy::Append { sort: None }
            .apply("l", Some(&json!("x")), &json!(1))
            .unwrap_err();
        assert!(matches!(err, DocError::TypeMismatch { .. }));
    }

    #[test]
    fn test_table_rejects_conflicts() {
        let options = UpdateOptions::new().append_to(["a"]).append_to_set(["a:id"]);
        assert!(StrategyTable::from_options(&options).is_err());
        let options = UpdateOptions::new().merge_to(["a"]);
        assert!(StrategyTable::from_options(&options).is_err());
        let options = UpdateOptions::new().append_to(["a:-n"]).remove_from(["b"]);
        let table = StrategyTable::from_options(&options).unwrap();
        assert_eq!(
            table.get("a"),
            Some(&ListStrategy::Append {
                sort: Some("-n".into())
            })
        );
    }
}
