use crate::transform::builtins;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single transform, carrying the underlying cause.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CastError(pub String);

impl CastError {
    pub fn new(msg: impl Into<String>) -> Self {
        CastError(msg.into())
    }
}

/// A transform: a pure function of a value and an optional argument.
pub type TransformFn = Arc<dyn Fn(&Value, Option<&str>) -> Result<Value, CastError> + Send + Sync>;

/// Pipeline tokens handled by the pipeline runner itself, never looked up.
pub const MARKERS: &[&str] = &["safe", "safe_none", "default"];

/// Closed mapping from transform token to function.
///
/// [`Default`] carries the built-ins; callers may [`register`] more.
///
/// [`register`]: TransformRegistry::register
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    /// A registry with no transforms at all.
    pub fn empty() -> Self {
        TransformRegistry {
            transforms: HashMap::new(),
        }
    }

    /// Add or replace the transform called `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&Value, Option<&str>) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    /// Whether `name` can appear in a pipeline.
    pub fn knows(&self, name: &str) -> bool {
        MARKERS.contains(&name) || self.transforms.contains_key(name)
    }

    pub fn apply(&self, name: &str, value: &Value, arg: Option<&str>) -> Result<Value, CastError> {
        match self.transforms.get(name) {
            Some(transform) => transform(value, arg),
            None => Err(CastError::new(format!("unknown transform `{name}`"))),
        }
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = TransformRegistry::empty();
        builtins::register_all(&mut registry);
        registry
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_custom_transform() {
        let mut registry = TransformRegistry::default();
        registry.register("double", |value, _| {
            value
                .as_i64()
                .map(|n| json!(n * 2))
                .ok_or_else(|| CastError::new("not an integer"))
        });
        assert_eq!(registry.apply("double", &json!(4), None).unwrap(), json!(8));
        assert!(registry.apply("double", &json!("x"), None).is_err());
    }

    #[test]
    fn test_unknown_transform() {
        let registry = TransformRegistry::empty();
        let err = registry.apply("nope", &json!(1), None).unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(!registry.knows("nope"));
        assert!(registry.knows("safe"));
    }
}
