use crate::error::{DocError, Result};
use crate::path::{is_index, path_starts_with, MAX_INDEX, SEPARATOR};
use crate::types::{Document, FlatMap};
use serde_json::map::Entry;
use serde_json::{Map, Value};

/// How a write treats values already present along its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Refuse to overwrite populated containers or descend through leaves.
    Strict,
    /// Replace whatever is in the way.
    Replace,
}

/// Rebuild a nested document from dotted paths.
///
/// Segments made only of decimal digits address sequence positions. A
/// path that treats a leaf as a branch, or addresses a sequence with a
/// string key (or a mapping with an index), is a structural conflict.
pub fn unflatten(flat: &FlatMap) -> Result<Document> {
    unflatten_only::<&str>(flat, &[])
}

/// Rebuild only the paths under `only_prefixes`; every other key is
/// copied through as a flat key. An empty prefix list rebuilds everything.
pub fn unflatten_only<S: AsRef<str>>(flat: &FlatMap, only_prefixes: &[S]) -> Result<Document> {
    let mut doc = Map::new();
    let mut passthrough = Vec::new();

    for (path, leaf) in flat {
        let selected = only_prefixes.is_empty()
            || only_prefixes
                .iter()
                .any(|prefix| path_starts_with(path, prefix.as_ref()));
        if !selected {
            passthrough.push((path, leaf));
            continue;
        }

        let segments: Vec<&str> = path.split(SEPARATOR).collect();
        write_into_map(&mut doc, &segments, leaf.clone(), path, WriteMode::Strict)?;
    }

    for (path, leaf) in passthrough {
        if doc.contains_key(path) {
            return Err(DocError::structural(path, "flat key collides with a rebuilt branch"));
        }
        doc.insert(path.clone(), leaf.clone());
    }

    Ok(doc)
}

pub(crate) fn write_into_map(
    map: &mut Map<String, Value>,
    segments: &[&str],
    leaf: Value,
    path: &str,
    mode: WriteMode,
) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    if is_index(head) {
        return Err(DocError::structural(
            path,
            format!("index `{head}` used against an object"),
        ));
    }

    let slot = match map.entry(head.to_string()) {
        Entry::Vacant(entry) => match rest.first() {
            None => {
                entry.insert(leaf);
                return Ok(());
            }
            Some(next) => entry.insert(empty_container(next)),
        },
        Entry::Occupied(entry) => {
            let slot = entry.into_mut();
            if rest.is_empty() {
                return assign_leaf(slot, leaf, path, mode);
            }
            slot
        }
    };

    descend(slot, rest, leaf, path, mode)
}

fn write_into_list(
    items: &mut Vec<Value>,
    segments: &[&str],
    leaf: Value,
    path: &str,
    mode: WriteMode,
) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    let idx = match head.parse::<usize>() {
        Ok(idx) if idx > MAX_INDEX => {
            return Err(DocError::structural(
                path,
                format!("index `{head}` exceeds the limit of {MAX_INDEX}"),
            ))
        }
        Ok(idx) if is_index(head) => idx,
        Err(_) if is_index(head) => {
            return Err(DocError::structural(
                path,
                format!("index `{head}` exceeds the limit of {MAX_INDEX}"),
            ))
        }
        _ => {
            return Err(DocError::structural(
                path,
                format!("key `{head}` used against a list"),
            ))
        }
    };

    // Pad with empty mappings so the index is valid.
    while items.len() <= idx {
        items.push(Value::Object(Map::new()));
    }
    let slot = &mut items[idx];

    if rest.is_empty() {
        assign_leaf(slot, leaf, path, mode)
    } else {
        descend(slot, rest, leaf, path, mode)
    }
}

fn descend(slot: &mut Value, segments: &[&str], leaf: Value, path: &str, mode: WriteMode) -> Result<()> {
    let Some(next) = segments.first() else {
        return Ok(());
    };
    let wants_list = is_index(next);

    let reshape = match &*slot {
        Value::Object(map) => wants_list && (map.is_empty() || mode == WriteMode::Replace),
        Value::Array(_) => !wants_list && mode == WriteMode::Replace,
        _ if mode == WriteMode::Replace => true,
        _ => {
            return Err(DocError::structural(
                path,
                "path uses a leaf value as a branch",
            ))
        }
    };
    if reshape {
        *slot = empty_container(next);
    }

    match slot {
        Value::Object(map) => write_into_map(map, segments, leaf, path, mode),
        Value::Array(items) => write_into_list(items, segments, leaf, path, mode),
        _ => Err(DocError::structural(path, "path uses a leaf value as a branch")),
    }
}

fn assign_leaf(slot: &mut Value, leaf: Value, path: &str, mode: WriteMode) -> Result<()> {
    let populated = match &*slot {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    };
    if populated && mode == WriteMode::Strict {
        return Err(DocError::structural(
            path,
            "path is both a leaf and a prefix of other paths",
        ));
    }
    *slot = leaf;
    Ok(())
}

fn empty_container(next_segment: &str) -> Value {
    if is_index(next_segment) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}
