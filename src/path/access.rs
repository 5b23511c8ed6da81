//! Reading and writing single dotted paths inside a document.
//!
//! A literal key that contains the separator takes precedence over the
//! nested interpretation, so flat keys spliced into a document stay
//! addressable.

use crate::error::Result;
use crate::path::unflatten::{write_into_map, WriteMode};
use crate::path::{is_index, SEPARATOR};
use crate::types::Document;
use serde_json::Value;

/// Look up the value at `path`, descending through mappings and sequences.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    if let Some(value) = doc.get(path) {
        return Some(value);
    }
    let mut segments = path.split(SEPARATOR);
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = child(current, segment)?;
    }
    Some(current)
}

pub fn get_path_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Value> {
    if doc.contains_key(path) {
        return doc.get_mut(path);
    }
    let mut segments = path.split(SEPARATOR);
    let first = segments.next()?;
    let mut current = doc.get_mut(first)?;
    for segment in segments {
        current = child_mut(current, segment)?;
    }
    Some(current)
}

/// Force-set `value` at `path`, creating mappings (or sequences, for
/// numeric segments) along the way and replacing anything in the way.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<()> {
    if doc.contains_key(path) {
        doc.insert(path.to_string(), value);
        return Ok(());
    }
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    write_into_map(doc, &segments, value, path, WriteMode::Replace)
}

/// Remove and return the value at `path`.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    if let Some(value) = doc.remove(path) {
        return Some(value);
    }
    let (parent, last) = path.rsplit_once(SEPARATOR)?;
    match get_path_mut(doc, parent)? {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let idx = index_of(last)?;
            (idx < items.len()).then(|| items.remove(idx))
        }
        _ => None,
    }
}

/// Remove the value at `path`, then drop ancestors left empty by it.
pub fn remove_path_pruned(doc: &mut Document, path: &str) -> Option<Value> {
    let removed = remove_path(doc, path)?;
    let mut current = path;
    while let Some((parent, _)) = current.rsplit_once(SEPARATOR) {
        let now_empty = matches!(get_path(doc, parent), Some(Value::Object(map)) if map.is_empty());
        if !now_empty {
            break;
        }
        remove_path(doc, parent);
        current = parent;
    }
    Some(removed)
}

fn index_of(segment: &str) -> Option<usize> {
    if is_index(segment) {
        segment.parse().ok()
    } else {
        None
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(index_of(segment)?),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(index_of(segment)?),
        _ => None,
    }
}
