use crate::error::{DocError, Result};
use serde_json::Value;

/// Raw field-spec input: comma-separated text or a (nested) list of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Text(String),
    List(Vec<FieldSpec>),
}

impl FieldSpec {
    /// Expand into individual trimmed tokens.
    ///
    /// Every text item is split on commas, so a single list element may
    /// stand in for several directives. Empty tokens are dropped.
    pub fn tokens(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens(&self, out: &mut Vec<String>) {
        match self {
            FieldSpec::Text(text) => out.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string),
            ),
            FieldSpec::List(items) => {
                for item in items {
                    item.collect_tokens(out);
                }
            }
        }
    }

    /// Read a spec from JSON: a string or an array of strings/arrays.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(FieldSpec::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(FieldSpec::from_value)
                .collect::<Result<Vec<_>>>()
                .map(FieldSpec::List),
            other => Err(DocError::spec(
                &other.to_string(),
                "field specs are strings or lists of strings",
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens().is_empty()
    }
}

impl From<&str> for FieldSpec {
    fn from(text: &str) -> Self {
        FieldSpec::Text(text.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(text: String) -> Self {
        FieldSpec::Text(text)
    }
}

impl From<&String> for FieldSpec {
    fn from(text: &String) -> Self {
        FieldSpec::Text(text.clone())
    }
}

impl<T: Into<FieldSpec>> From<Vec<T>> for FieldSpec {
    fn from(items: Vec<T>) -> Self {
        FieldSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldSpec> + Clone> From<&[T]> for FieldSpec {
    fn from(items: &[T]) -> Self {
        FieldSpec::List(items.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<FieldSpec>, const N: usize> From<[T; N]> for FieldSpec {
    fn from(items: [T; N]) -> Self {
        FieldSpec::List(items.into_iter().map(Into::into).collect())
    }
}
