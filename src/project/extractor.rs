use crate::error::{DocError, ErrorPolicy, Result, StrictPolicy};
use crate::fields::{compile_tokens, Assignment, FieldSpec, Pipeline, Projection};
use crate::merge::merge;
use crate::path::{
    flatten_value, get_path, get_path_mut, remove_path_pruned, set_path, unflatten,
    unflatten_only,
};
use crate::project::select::select;
use crate::transform::{datetime, TransformRegistry};
use crate::types::{Document, JsonType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

const PLUCK: &str = "..";

/// Configuration for projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Run cast pipelines on null values too
    pub cast_null: bool,
    /// Cache compiled projections by their field spec
    pub memoize: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            cast_null: true,
            memoize: true,
        }
    }
}

/// Evaluates field specs against documents.
pub struct Extractor {
    config: ExtractConfig,
    registry: TransformRegistry,
    policy: Box<dyn ErrorPolicy>,
    cache: RefCell<HashMap<String, Rc<Projection>>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(ExtractConfig::default())
    }
}

impl Extractor {
    pub fn new(config: ExtractConfig) -> Self {
        Extractor {
            config,
            registry: TransformRegistry::default(),
            policy: Box::new(StrictPolicy),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self.cache.borrow_mut().clear();
        self
    }

    pub fn with_policy(mut self, policy: impl ErrorPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Compile a field spec, reusing an earlier compilation when memoizing.
    pub fn compile(&self, spec: impl Into<FieldSpec>) -> Result<Rc<Projection>> {
        let tokens = spec.into().tokens();
        if !self.config.memoize {
            return compile_tokens(&tokens).map(Rc::new);
        }

        let key = tokens.join(",");
        if let Some(projection) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(projection));
        }
        let projection = Rc::new(compile_tokens(&tokens)?);
        self.cache.borrow_mut().insert(key, Rc::clone(&projection));
        Ok(projection)
    }

    /// Keep only the parts of `doc` the field spec includes.
    ///
    /// Renames, transforms and assignments in the field spec are ignored.
    pub fn subset(&self, doc: &Document, spec: impl Into<FieldSpec>) -> Result<Document> {
        self.compile(spec)
            .and_then(|projection| select(doc, &projection))
            .map_err(|err| self.policy.raise(err))
    }

    /// Project `doc` through every stage of the field spec, then fill in
    /// `defaults` for anything still absent.
    pub fn extract(
        &self,
        doc: &Document,
        spec: impl Into<FieldSpec>,
        defaults: Option<&Document>,
    ) -> Result<Document> {
        self.compile(spec)
            .and_then(|projection| self.project(doc, &projection, defaults))
            .map_err(|err| self.policy.raise(err))
    }

    /// Evaluate an already compiled projection.
    pub fn project(
        &self,
        doc: &Document,
        projection: &Projection,
        defaults: Option<&Document>,
    ) -> Result<Document> {
        self.check_pipelines(projection)?;

        let mut out = select(doc, projection)?;
        debug!(fields = ?projection.fields, keys = out.len(), "selected base document");

        self.apply_flattens(&mut out, projection);
        self.apply_renames(&mut out, projection)?;
        self.apply_assignments(&mut out, projection)?;
        self.apply_transforms(&mut out, projection)?;
        self.apply_unflattens(&mut out, projection)?;

        if let Some(defaults) = defaults {
            merge(&mut out, defaults);
        }

        if let Some(name) = &projection.envelope {
            let mut wrapped = Map::new();
            wrapped.insert(name.clone(), Value::Object(out));
            out = wrapped;
        }
        Ok(out)
    }

    fn check_pipelines(&self, projection: &Projection) -> Result<()> {
        let pipelines = projection
            .transforms
            .iter()
            .chain(projection.assignments.iter().map(|(path, a)| (path, &a.pipeline)));
        for (path, pipeline) in pipelines {
            if let Some(step) = pipeline.steps.iter().find(|s| !self.registry.knows(&s.name)) {
                return Err(DocError::spec(path, format!("unknown transform `{}`", step.name)));
            }
        }
        Ok(())
    }

    fn apply_flattens(&self, out: &mut Document, projection: &Projection) {
        for (path, mode) in &projection.flattens {
            if let Some(slot) = get_path_mut(out, path) {
                if let Some(flat) = flatten_value(slot, mode.keep_lists()) {
                    *slot = Value::Object(flat);
                }
            }
        }
    }

    fn apply_renames(&self, out: &mut Document, projection: &Projection) -> Result<()> {
        let moved: Vec<(&String, &Vec<String>, Value)> = projection
            .renames
            .iter()
            .filter_map(|(source, targets)| {
                get_path(out, source).map(|value| (source, targets, value.clone()))
            })
            .collect();

        if !projection.star {
            for (source, _, _) in &moved {
                if !projection.explicit.contains(*source) {
                    remove_path_pruned(out, source);
                }
            }
        }
        for (_, targets, value) in moved {
            for target in targets {
                set_path(out, target, value.clone())?;
            }
        }
        Ok(())
    }

    fn apply_assignments(&self, out: &mut Document, projection: &Projection) -> Result<()> {
        for (path, assignment) in &projection.assignments {
            let value = self.assigned_value(path, assignment)?;

            let Some((list, field)) = path.split_once(PLUCK) else {
                if !(assignment.is_default() && get_path(out, path).is_some()) {
                    set_path(out, path, value)?;
                }
                continue;
            };

            match get_path_mut(out, list) {
                Some(Value::Array(items)) => {
                    for item in items {
                        let Value::Object(element) = item else {
                            return Err(DocError::TypeMismatch {
                                path: list.to_string(),
                                expected: "a list of objects",
                                actual: JsonType::from_value(item).as_str(),
                            });
                        };
                        if !(assignment.is_default() && get_path(element, field).is_some()) {
                            set_path(element, field, value.clone())?;
                        }
                    }
                }
                Some(other) => {
                    return Err(DocError::TypeMismatch {
                        path: list.to_string(),
                        expected: "array",
                        actual: JsonType::from_value(other).as_str(),
                    })
                }
                None => debug!(path = %path, "no list to assign into"),
            }
        }
        Ok(())
    }

    fn assigned_value(&self, path: &str, assignment: &Assignment) -> Result<Value> {
        let literal = match assignment.literal.as_str() {
            "__NOW__" => Value::String(datetime::now()),
            "__TODAY__" => Value::String(datetime::today()),
            "__OID__" => Value::String(Uuid::new_v4().simple().to_string()),
            "__NULL__" => Value::Object(Map::new()),
            other => Value::String(other.to_string()),
        };
        self.run_pipeline(path, literal, &assignment.pipeline)
    }

    fn apply_transforms(&self, out: &mut Document, projection: &Projection) -> Result<()> {
        for (path, pipeline) in &projection.transforms {
            let Some(slot) = get_path_mut(out, path) else {
                continue;
            };
            if slot.is_null() && !self.config.cast_null {
                continue;
            }
            let value = std::mem::take(slot);
            *slot = self.run_pipeline(path, value, pipeline)?;
        }
        Ok(())
    }

    /// Run `value` through the pipeline's transforms in order.
    ///
    /// A failing step aborts unless the pipeline carries `safe` (keep the
    /// starting value) or `safe_none` (use null).
    fn run_pipeline(&self, path: &str, value: Value, pipeline: &Pipeline) -> Result<Value> {
        let mut current = value.clone();
        for step in pipeline.transforms() {
            match self.registry.apply(&step.name, &current, step.arg.as_deref()) {
                Ok(next) => current = next,
                Err(cause) => {
                    let step = step.to_string();
                    let err = DocError::Transform {
                        path: path.to_string(),
                        step: step.clone(),
                        cause: cause.to_string(),
                    };
                    if pipeline.is_safe() {
                        self.policy.swallowed(path, &step, &err);
                        return Ok(value);
                    }
                    if pipeline.is_safe_none() {
                        self.policy.swallowed(path, &step, &err);
                        return Ok(Value::Null);
                    }
                    return Err(err);
                }
            }
        }
        Ok(current)
    }

    fn apply_unflattens(&self, out: &mut Document, projection: &Projection) -> Result<()> {
        for path in &projection.unflattens {
            *out = unflatten_only(out, &[path])?;
            if let Some(Value::Object(map)) = get_path_mut(out, path) {
                *map = unflatten(map)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transform::CastError;
    use serde_json::json;
    use std::cell::Cell;

    fn doc(value: Value) -> Document {
        crate::types::document_from_value(value).unwrap()
    }

    fn extract(value: Value, spec: &str) -> Result<Value> {
        Extractor::default()
            .extract(&doc(value), spec, None)
            .map(Value::Object)
    }

    #[test]
    fn test_defaults_fill_gaps_only() {
        let extractor = Extractor::default();
        let d = doc(json!({"a": 1, "b": 2}));
        let out = extractor.extract(&d, "a,d", Some(&doc(json!({"d": 3})))).unwrap();
        assert_eq!(Value::Object(out), json!({"a": 1, "d": 3}));
        let out = extractor.extract(&d, "a,b", Some(&doc(json!({"b": 3})))).unwrap();
        assert_eq!(Value::Object(out), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_assignment_keeps_literal_text() {
        assert_eq!(extract(json!({"a": 1}), "a:=2").unwrap(), json!({"a": "2"}));
        assert_eq!(extract(json!({"a": 1}), "a:=2:int").unwrap(), json!({"a": 2}));
    }

    #[test]
    fn test_nested_rename_and_cast() {
        let out = extract(
            json!({"c": "123", "b": "345"}),
            "c__as__a.c:float,b__as__a.b:float,a.dd:=dd",
        )
        .unwrap();
        assert_eq!(out, json!({"a": {"c": 123.0, "b": 345.0, "dd": "dd"}}));
    }

    #[test]
    fn test_rename_keeps_explicit_source() {
        let out = extract(json!({"a": 1, "b": 2}), "a__as__x,a,a__as__y").unwrap();
        assert_eq!(out, json!({"a": 1, "x": 1, "y": 1}));
        let out = extract(json!({"a": {"b": 1}}), "a.b__as__").unwrap();
        assert_eq!(out, json!({"b": 1}));
    }

    #[test]
    fn test_star_rename_keeps_source() {
        let out = extract(json!({"a": 1, "b": 2}), "*,a__as__c,-b").unwrap();
        assert_eq!(out, json!({"a": 1, "c": 1}));
    }

    #[test]
    fn test_default_assignment() {
        let out = extract(json!({"a": 1}), "a:=5:int|default,b:=5:int|default").unwrap();
        assert_eq!(out, json!({"a": 1, "b": 5}));
    }

    #[test]
    fn test_broadcast_assignment() {
        let out = extract(
            json!({"items": [{"id": 1}, {"id": 2, "kind": "y"}]}),
            "items..kind:=x:default",
        )
        .unwrap();
        assert_eq!(out, json!({"items": [{"id": 1, "kind": "x"}, {"id": 2, "kind": "y"}]}));

        let err = extract(json!({"items": [1]}), "items..kind:=x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_sentinels() {
        let out = extract(json!({}), "t:=__NOW__,d:=__TODAY__,id:=__OID__,n:=__NULL__").unwrap();
        assert_eq!(out["t"].as_str().unwrap().len(), 19);
        assert!(out["d"].as_str().unwrap().ends_with("T00:00:00"));
        assert_eq!(out["id"].as_str().unwrap().len(), 32);
        assert_eq!(out["n"], json!({}));
    }

    #[test]
    fn test_transform_failures() {
        let err = extract(json!({"a": "x"}), "a:int").unwrap_err();
        match err {
            DocError::Transform { path, step, .. } => {
                assert_eq!(path, "a");
                assert_eq!(step, "int");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(extract(json!({"a": "x"}), "a:int|safe").unwrap(), json!({"a": "x"}));
        assert_eq!(
            extract(json!({"a": "x"}), "a:int|safe_none").unwrap(),
            json!({"a": null})
        );
        assert!(extract(json!({"a": 1}), "a:frobnicate").is_err());
    }

    #[test]
    fn test_cast_null_switch() {
        let d = doc(json!({"a": null}));
        let extractor = Extractor::default();
        let strict = Extractor::new(ExtractConfig {
            cast_null: false,
            ..ExtractConfig::default()
        });
        assert_eq!(
            Value::Object(strict.extract(&d, "a:len", None).unwrap()),
            json!({"a": null})
        );
        assert!(extractor.extract(&d, "a:len", None).is_err());
    }

    #[test]
    fn test_flat_and_unflat() {
        let out = extract(json!({"m": {"a": {"b": 1}, "l": [1, 2]}}), "m:flat").unwrap();
        assert_eq!(out, json!({"m": {"a.b": 1, "l": [1, 2]}}));

        let out = extract(json!({"m": {"a": {"b": 1}, "l": [1, 2]}}), "m:flatall").unwrap();
        assert_eq!(out, json!({"m": {"a.b": 1, "l.0": 1, "l.1": 2}}));

        let out = extract(json!({"cfg.a": 1, "cfg.b.c": 2, "z": 0}), "cfg:unflat,z").unwrap();
        assert_eq!(out, json!({"cfg": {"a": 1, "b": {"c": 2}}, "z": 0}));
    }

    #[test]
    fn test_envelope() {
        let out = extract(json!({"a": 1, "b": 2}), "a,__as__data").unwrap();
        assert_eq!(out, json!({"data": {"a": 1}}));
    }

    #[test]
    fn test_conflicting_directives() {
        let err = extract(json!({"a": 1}), "a,-b").unwrap_err();
        assert!(matches!(err, DocError::ConflictingDirectives(_)));
    }

    #[test]
    fn test_memoized_compilation() {
        let extractor = Extractor::default();
        let first = extractor.compile("a, b").unwrap();
        let second = extractor.compile(vec!["a", "b"]).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_custom_registry_and_policy() {
        struct Counting(Rc<Cell<u32>>);
        impl ErrorPolicy for Counting {
            fn swallowed(&self, _path: &str, _step: &str, _err: &DocError) {
                self.0.set(self.0.get() + 1);
            }
        }

        let counter = Rc::new(Cell::new(0));
        let mut registry = TransformRegistry::default();
        registry.register("fail", |_, _| Err(CastError::new("always")));
        let extractor = Extractor::default()
            .with_registry(registry)
            .with_policy(Counting(Rc::clone(&counter)));

        let out = extractor.extract(&doc(json!({"a": 1})), "a:fail|safe", None).unwrap();
        assert_eq!(Value::Object(out), json!({"a": 1}));
        assert_eq!(counter.get(), 1);
        assert!(extractor.registry().knows("fail"));
    }
}
