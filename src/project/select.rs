use crate::error::{DocError, Result};
use crate::fields::{Projection, Selector};
use crate::merge::merge;
use crate::path::{
    flatten, get_path, path_starts_with, remove_path, set_path, unflatten, SEPARATOR,
};
use crate::types::{Document, FlatMap};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Inclusion/exclusion pass shared by `subset` and the first `extract` stage.
pub(crate) fn select(doc: &Document, projection: &Projection) -> Result<Document> {
    if projection.has_conflict() {
        return Err(DocError::ConflictingDirectives(format!(
            "can not both include and exclude keys without `*`: {}",
            projection.fields.join(",")
        )));
    }

    let keep_all = projection.star || (projection.include.is_empty() && !projection.exclude.is_empty());
    let mut out = if keep_all {
        doc.clone()
    } else {
        include(doc, &projection.include)?
    };

    for path in &projection.exclude {
        remove_path(&mut out, path);
    }
    Ok(out)
}

fn include(doc: &Document, selectors: &[Selector]) -> Result<Document> {
    let mut out = Map::new();
    let mut nested: Vec<&str> = Vec::new();
    let mut prefixes: Vec<&str> = Vec::new();

    for selector in selectors {
        match selector {
            Selector::Exact(path) => {
                if let Some(value) = doc.get(path) {
                    out.insert(path.clone(), value.clone());
                } else if path.contains(SEPARATOR) {
                    nested.push(path);
                }
            }
            Selector::Flat(prefix) => {
                for (key, value) in doc {
                    if path_starts_with(key, prefix) {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
            Selector::Pluck {
                list,
                field,
                target,
            } => {
                if let Some(Value::Array(items)) = get_path(doc, list) {
                    set_path(&mut out, target, pluck(items, field))?;
                }
            }
            Selector::Prefix(prefix) => prefixes.push(prefix),
        }
    }

    // only the requested leaves of a branch are pulled in
    if !nested.is_empty() {
        let picked: FlatMap = flatten(doc, false)
            .into_iter()
            .filter(|(key, _)| nested.iter().any(|path| path_starts_with(key, path)))
            .collect();
        merge(&mut out, &unflatten(&picked)?);
    }

    // wildcard matches never reach into keys set by exact selectors
    if !prefixes.is_empty() {
        let fixed: BTreeSet<String> = out.keys().cloned().collect();
        let flat = flatten(doc, true);
        for prefix in prefixes {
            let cut = prefix.rfind(SEPARATOR).map_or(0, |idx| idx + 1);
            let matched: FlatMap = flat
                .iter()
                .filter(|(key, _)| key.starts_with(prefix) && key.len() > cut)
                .map(|(key, value)| (key[cut..].to_string(), value.clone()))
                .filter(|(key, _)| {
                    let owner = key.split(SEPARATOR).next().unwrap_or(key);
                    !fixed.contains(owner)
                })
                .collect();
            if !matched.is_empty() {
                merge(&mut out, &unflatten(&matched)?);
            }
        }
    }

    Ok(out)
}

fn pluck(items: &[Value], field: &str) -> Value {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => get_path(map, field).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        })
        .collect()
}
