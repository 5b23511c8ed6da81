use crate::error::{DocError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A document: a mapping from string keys to nested values.
pub type Document = Map<String, Value>;

/// A flat mapping from dot-joined paths to leaf values.
pub type FlatMap = Map<String, Value>;

/// Normalize any serializable value into a [`Document`].
///
/// This is the single entry point for raw input: structs, hash maps and
/// `serde_json::Value`s all pass through here, and nested mappings and
/// sequences are deep-copied on the way in.
pub fn to_document<T: Serialize + ?Sized>(raw: &T) -> Result<Document> {
    document_from_value(serde_json::to_value(raw)?)
}

/// Take ownership of a [`Value`] whose root must be an object.
pub fn document_from_value(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DocError::NotADocument(JsonType::from_value(&other).as_str())),
    }
}

/// Type identifier for JSON values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    JsonType::Integer
                } else {
                    JsonType::Number
                }
            }
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }

    /// Whether `value` satisfies this type. Integers count as numbers.
    pub fn matches(self, value: &Value) -> bool {
        let actual = JsonType::from_value(value);
        actual == self || (self == JsonType::Number && actual == JsonType::Integer)
    }
}

/// Python-style truthiness: null, false, zero and empty containers are falsy.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total ordering over values, used by the sort transforms.
///
/// Values of different types order by type (null first, objects last).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(0.0);
                    let y = y.as_f64().unwrap_or(0.0);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Render a scalar the way it reads in text; containers render as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_to_document_normalizes_maps() {
        let mut raw = HashMap::new();
        raw.insert("a", vec![1, 2]);
        let doc = to_document(&raw).unwrap();
        assert_eq!(Value::Object(doc), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_non_object_root_rejected() {
        let err = document_from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_truthiness() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!("")));
        assert!(is_falsy(&json!({})));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!([0])));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }

    #[test]
    fn test_json_type_matches() {
        assert!(JsonType::Number.matches(&json!(3)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
        assert_eq!(JsonType::from_value(&json!("x")).as_str(), "string");
    }
}
