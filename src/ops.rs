//! Convenience operations on documents.
//!
//! These build on the path codec and the merger for common chores:
//! validating required keys, masking secrets, moving leaves around.

use crate::error::{DocError, Result};
use crate::merge::merge;
use crate::path::{flatten, get_path, is_index, unflatten, SEPARATOR};
use crate::types::{Document, JsonType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use crate::merge::deep_update;

const MASK: &str = "******";

/// Build the nested value a single dotted path describes.
///
/// Index segments produce sequences padded with nulls, so `a.1` with `v`
/// yields `{"a": [null, v]}`.
pub fn from_dotted(path: &str, value: Value) -> Value {
    let (key, rest) = match path.split_once(SEPARATOR) {
        Some((key, rest)) => (key, Some(rest)),
        None => (path, None),
    };
    let inner = match rest {
        Some(rest) => from_dotted(rest, value),
        None => value,
    };
    match key.parse::<usize>() {
        Ok(idx) if is_index(key) => {
            let mut items = vec![Value::Null; idx];
            items.push(inner);
            Value::Array(items)
        }
        _ => {
            let mut map = Map::new();
            map.insert(key.to_string(), inner);
            Value::Object(map)
        }
    }
}

/// Value at `path`, or `default` when absent.
pub fn fget(doc: &Document, path: &str, default: Value) -> Value {
    get_path(doc, path).cloned().unwrap_or(default)
}

/// Set `path` to `value` unless something is already there.
pub fn set_default(doc: &mut Document, path: &str, value: Value) -> Result<()> {
    if get_path(doc, path).is_some() {
        return Ok(());
    }
    match from_dotted(path, value) {
        Value::Object(nested) => {
            merge(doc, &nested);
            Ok(())
        }
        other => Err(DocError::NotADocument(JsonType::from_value(&other).as_str())),
    }
}

/// Copy of `doc` without `keys`.
///
/// With `flat`, keys are dotted paths into the flattened view (lists kept
/// whole); otherwise they are top-level keys.
pub fn remove<S: AsRef<str>>(doc: &Document, keys: &[S], flat: bool) -> Result<Document> {
    if !flat {
        let mut out = doc.clone();
        for key in keys {
            out.remove(key.as_ref());
        }
        return Ok(out);
    }

    let mut flat_doc = flatten(doc, true);
    for key in keys {
        flat_doc.remove(key.as_ref());
    }
    unflatten(&flat_doc)
}

/// Flat leaves under `prefix`, keyed relative to it, on top of `defaults`.
pub fn get_tree(doc: &Document, prefix: &str, defaults: Option<&Document>) -> Document {
    let prefix = if prefix.ends_with(SEPARATOR) {
        prefix.to_string()
    } else {
        format!("{prefix}{SEPARATOR}")
    };
    let mut out = defaults.cloned().unwrap_or_default();
    for (key, value) in flatten(doc, true) {
        if let Some(rest) = key.strip_prefix(&prefix) {
            out.insert(rest.to_string(), value);
        }
    }
    out
}

/// Requirements checked by [`has`].
#[derive(Debug, Clone)]
pub struct HasOptions {
    /// Type every present key must have
    pub check_type: Option<JsonType>,
    /// Values a present key may take; empty allows anything
    pub allowed_values: Vec<Value>,
    pub allow_missing: bool,
    /// Fail on any problem; otherwise only when every key has one
    pub all: bool,
    /// Replaces the generated message; `{}` is substituted with it
    pub message: Option<String>,
}

impl Default for HasOptions {
    fn default() -> Self {
        HasOptions {
            check_type: Some(JsonType::String),
            allowed_values: Vec::new(),
            allow_missing: false,
            all: true,
            message: None,
        }
    }
}

/// Validate presence, type and allowed values of `keys`.
pub fn has<S: AsRef<str>>(doc: &Document, keys: &[S], options: &HasOptions) -> Result<()> {
    let mut errors = Vec::new();
    let mut report = |msg: String| {
        errors.push(match &options.message {
            Some(custom) if custom.contains("{}") => custom.replace("{}", &msg),
            Some(custom) => custom.clone(),
            None => msg,
        });
    };

    for key in keys {
        let key = key.as_ref();
        match get_path(doc, key) {
            Some(value) => {
                if let Some(expected) = options.check_type {
                    if !expected.matches(value) {
                        report(format!(
                            "`{key}` must be type `{}`, got `{}` instead",
                            expected.as_str(),
                            JsonType::from_value(value).as_str()
                        ));
                    }
                }
                if !options.allowed_values.is_empty() && !options.allowed_values.contains(value) {
                    report(invalid_value(key, &options.allowed_values));
                }
            }
            None if options.allow_missing => {}
            None if !options.allowed_values.is_empty() => {
                report(invalid_value(key, &options.allowed_values));
            }
            None => report(format!("missing key `{key}`")),
        }
    }

    let failed = if options.all {
        !errors.is_empty()
    } else {
        !keys.is_empty() && errors.len() >= keys.len()
    };
    if failed {
        return Err(DocError::Validation(errors.join(". ")));
    }
    Ok(())
}

fn invalid_value(key: &str, allowed: &[Value]) -> String {
    let allowed: Vec<String> = allowed.iter().map(Value::to_string).collect();
    format!(
        "missing key or invalid value for `{key}`, allowed values are: {}",
        allowed.join(", ")
    )
}

/// Whether every top-level entry of `other`, minus `exclude`, is in `doc`.
pub fn contains<S: AsRef<str>>(doc: &Document, other: &Document, exclude: &[S]) -> bool {
    other
        .iter()
        .filter(|(key, _)| !exclude.iter().any(|ex| ex.as_ref() == key.as_str()))
        .all(|(key, value)| doc.get(key) == Some(value))
}

/// Replace every leaf whose path ends with one of `patterns`.
pub fn mask<S: AsRef<str>>(doc: &Document, patterns: &[S]) -> Result<Document> {
    let mut flat = flatten(doc, true);
    for (key, value) in flat.iter_mut() {
        if patterns.iter().any(|p| key.ends_with(p.as_ref())) {
            *value = Value::String(MASK.to_string());
        }
    }
    unflatten(&flat)
}

/// Move leaves to new locations: each flat path named in `rules` lands at
/// its target path. Leaves without a rule are dropped.
pub fn remap(doc: &Document, rules: &BTreeMap<String, String>) -> Result<Document> {
    let mut out = Map::new();
    for (path, value) in flatten(doc, true) {
        let Some(target) = rules.get(&path) else {
            continue;
        };
        match from_dotted(target, value) {
            Value::Object(nested) => merge(&mut out, &nested),
            other => return Err(DocError::NotADocument(JsonType::from_value(&other).as_str())),
        }
    }
    Ok(out)
}

/// Value of the first of `keys` present at the top level.
pub fn get_first<'a, S: AsRef<str>>(doc: &'a Document, keys: &[S]) -> Result<&'a Value> {
    keys.iter()
        .find_map(|key| doc.get(key.as_ref()))
        .ok_or_else(|| {
            let names: Vec<&str> = keys.iter().map(|key| key.as_ref()).collect();
            DocError::MissingKey(names.join(", "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        crate::types::document_from_value(value).unwrap()
    }

    #[test]
    fn test_from_dotted() {
        assert_eq!(from_dotted("a.b.c", json!(100)), json!({"a": {"b": {"c": 100}}}));
        assert_eq!(from_dotted("a.b.1", json!(100)), json!({"a": {"b": [null, 100]}}));
    }

    #[test]
    fn test_fget_and_set_default() {
        let mut d = doc(json!({"a": {"b": 1}}));
        assert_eq!(fget(&d, "a.b", json!(0)), json!(1));
        assert_eq!(fget(&d, "a.c", json!(0)), json!(0));

        set_default(&mut d, "a.b", json!(5)).unwrap();
        set_default(&mut d, "a.c", json!(5)).unwrap();
        assert_eq!(Value::Object(d.clone()), json!({"a": {"b": 1, "c": 5}}));
        assert!(set_default(&mut d, "0.x", json!(1)).is_err());
    }

    #[test]
    fn test_remove() {
        let d = doc(json!({"a": {"b": 1, "c": 2}, "d": 3}));
        assert_eq!(Value::Object(remove(&d, &["d"], false).unwrap()), json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(
            Value::Object(remove(&d, &["a.b"], true).unwrap()),
            json!({"a": {"c": 2}, "d": 3})
        );
    }

    #[test]
    fn test_get_tree() {
        let d = doc(json!({"cfg.db.host": "h", "cfg.db.port": 1, "other": 0}));
        let defaults = doc(json!({"user": "root"}));
        assert_eq!(
            Value::Object(get_tree(&d, "cfg.db", Some(&defaults))),
            json!({"host": "h", "port": 1, "user": "root"})
        );
    }

    #[test]
    fn test_has() {
        let d = doc(json!({"name": "x", "age": 3, "kind": "a"}));
        assert!(has(&d, &["name"], &HasOptions::default()).is_ok());

        let err = has(&d, &["age"], &HasOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(err.to_string().contains("age"));

        let numbers = HasOptions {
            check_type: Some(JsonType::Number),
            ..HasOptions::default()
        };
        assert!(has(&d, &["age"], &numbers).is_ok());

        let allowed = HasOptions {
            allowed_values: vec![json!("a"), json!("b")],
            ..HasOptions::default()
        };
        assert!(has(&d, &["kind"], &allowed).is_ok());
        assert!(has(&d, &["name"], &allowed).is_err());

        let any = HasOptions {
            all: false,
            ..HasOptions::default()
        };
        assert!(has(&d, &["name", "missing"], &any).is_ok());
        assert!(has(&d, &["gone", "missing"], &any).is_err());

        let lenient = HasOptions {
            allow_missing: true,
            ..HasOptions::default()
        };
        assert!(has(&d, &["missing"], &lenient).is_ok());
    }

    #[test]
    fn test_contains() {
        let d = doc(json!({"a": 1, "b": 2}));
        assert!(contains(&d, &doc(json!({"a": 1})), &[] as &[&str]));
        assert!(!contains(&d, &doc(json!({"a": 1, "c": 3})), &[] as &[&str]));
        assert!(contains(&d, &doc(json!({"a": 1, "c": 3})), &["c"]));
    }

    #[test]
    fn test_mask() {
        let d = doc(json!({"db": {"password": "p", "user": "u"}, "api_password": "q"}));
        assert_eq!(
            Value::Object(mask(&d, &["password"]).unwrap()),
            json!({"db": {"password": "******", "user": "u"}, "api_password": "******"})
        );
    }

    #[test]
    fn test_remap() {
        let d = doc(json!({"user": {"first": "a", "last": "b"}, "drop": 1}));
        let rules: BTreeMap<String, String> = [
            ("user.first".to_string(), "name.given".to_string()),
            ("user.last".to_string(), "name.family".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            Value::Object(remap(&d, &rules).unwrap()),
            json!({"name": {"given": "a", "family": "b"}})
        );
    }

    #[test]
    fn test_get_first() {
        let d = doc(json!({"b": 2, "c": 3}));
        assert_eq!(get_first(&d, &["a", "b", "c"]).unwrap(), &json!(2));
        let err = get_first(&d, &["x", "y"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Key);
    }
}
