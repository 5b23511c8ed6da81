use crate::error::{DocError, Result};
use crate::transform::MARKERS;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One pipeline member: a transform name and its optional argument
/// (`index:0` has name `index` and argument `0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub arg: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Step {
            name: name.into(),
            arg: None,
        }
    }

    pub fn is_marker(&self) -> bool {
        MARKERS.contains(&self.name.as_str())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}:{}", self.name, arg),
            None => f.write_str(&self.name),
        }
    }
}

/// Ordered transform steps attached to a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Parse `tr1|tr2:arg|...`; `token` is only used for error messages.
    pub fn parse(text: &str, token: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for raw in text.split('|') {
            let raw = raw.trim();
            let (name, arg) = match raw.split_once(':') {
                Some((name, arg)) => (name.trim(), Some(arg.to_string())),
                None => (raw, None),
            };
            if name.is_empty() {
                return Err(DocError::spec(token, "empty transform in pipeline"));
            }
            steps.push(Step {
                name: name.to_string(),
                arg,
            });
        }
        Ok(Pipeline { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.steps.iter().any(|step| step.name == name)
    }

    /// Failures keep the value the pipeline started from.
    pub fn is_safe(&self) -> bool {
        self.has("safe")
    }

    /// Failures turn the value into null.
    pub fn is_safe_none(&self) -> bool {
        self.has("safe_none")
    }

    /// Steps that actually transform a value.
    pub fn transforms(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|step| !step.is_marker())
    }

    pub fn extend(&mut self, other: Pipeline) {
        self.steps.extend(other.steps);
    }

    /// Split off the structural steps (`flat`, `flatall`, `unflat`).
    pub(crate) fn split_structural(self) -> (Option<FlattenMode>, bool, Pipeline) {
        let mut flatten = None;
        let mut unflat = false;
        let mut rest = Vec::new();
        for step in self.steps {
            match step.name.as_str() {
                "flat" => flatten = Some(FlattenMode::KeepLists),
                "flatall" => flatten = Some(FlattenMode::All),
                "unflat" => unflat = true,
                _ => rest.push(step),
            }
        }
        (flatten, unflat, Pipeline { steps: rest })
    }
}

/// How far a `flat` request expands a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenMode {
    /// `flat`: sequences stay whole.
    KeepLists,
    /// `flatall`: sequences are expanded too.
    All,
}

impl FlattenMode {
    pub fn keep_lists(self) -> bool {
        self == FlattenMode::KeepLists
    }
}

/// A forced value (`key:=literal[:pipeline]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub literal: String,
    pub pipeline: Pipeline,
}

impl Assignment {
    /// Only fire when the target key is absent.
    pub fn is_default(&self) -> bool {
        self.pipeline.has("default")
    }
}

/// What part of the source document an include token selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// A key or nested path, e.g. `a` or `a.b.0`.
    Exact(String),
    /// Everything whose flat path starts with the prefix, re-rooted at the
    /// prefix's last separator (`a.b.*`, `ab*`).
    Prefix(String),
    /// The `field` of every element of the sequence at `list`, collected
    /// into a sequence stored at `target` (`list..field`).
    Pluck {
        list: String,
        field: String,
        target: String,
    },
    /// Top-level keys at or literally below `prefix`, used by `unflat`.
    Flat(String),
}

/// Compiled form of a field spec. Built once, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// The expanded token list, in order.
    pub fields: Vec<String>,
    pub include: Vec<Selector>,
    pub exclude: Vec<String>,
    pub star: bool,
    /// Paths included by a plain token, without a rename.
    pub explicit: BTreeSet<String>,
    /// Source path to new names; a path may be renamed several times.
    pub renames: BTreeMap<String, Vec<String>>,
    /// New name to source path.
    pub renames_rev: BTreeMap<String, String>,
    /// Output path to transform pipeline.
    pub transforms: BTreeMap<String, Pipeline>,
    /// Target path to forced value, in spec order.
    pub assignments: Vec<(String, Assignment)>,
    /// Source path to flatten request.
    pub flattens: BTreeMap<String, FlattenMode>,
    /// Output paths to rebuild from flat keys.
    pub unflattens: Vec<String>,
    pub envelope: Option<String>,
}

impl Projection {
    /// Whether the field spec mixes inclusions and exclusions without `*`.
    pub fn has_conflict(&self) -> bool {
        !self.star && !self.include.is_empty() && !self.exclude.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn include_selector(&mut self, selector: Selector) {
        if !self.include.contains(&selector) {
            self.include.push(selector);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_parse() {
        let pipeline = Pipeline::parse("strip|index:0|slice:1:3|safe", "t").unwrap();
        let rendered: Vec<String> = pipeline.steps.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["strip", "index:0", "slice:1:3", "safe"]);
        assert!(pipeline.is_safe());
        assert_eq!(pipeline.transforms().count(), 3);
    }

    #[test]
    fn test_pipeline_rejects_empty_steps() {
        assert!(Pipeline::parse("int||str", "t").is_err());
        assert!(Pipeline::parse("", "t").is_err());
    }

    #[test]
    fn test_split_structural() {
        let pipeline = Pipeline::parse("flatall|int|unflat", "t").unwrap();
        let (flatten, unflat, rest) = pipeline.split_structural();
        assert_eq!(flatten, Some(FlattenMode::All));
        assert!(unflat);
        assert_eq!(rest.steps, vec![Step::new("int")]);
    }
}
