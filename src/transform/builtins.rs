//! Built-in transforms available to every field spec.

use crate::transform::datetime;
use crate::transform::{CastError, TransformRegistry};
use crate::types::{compare_values, is_falsy, value_to_text, JsonType};
use serde_json::{Number, Value};

const TRUTHY: &[&str] = &["t", "true", "y", "yes", "on", "1"];
const FALSEY: &[&str] = &["f", "false", "n", "no", "off", "0"];

pub(crate) fn register_all(registry: &mut TransformRegistry) {
    registry
        .register("str", to_str)
        .register("unicode", to_str)
        .register("int", to_int)
        .register("float", to_float)
        .register("bool", to_bool)
        .register("dt", to_datetime)
        .register("strip", strip)
        .register("lower", |v, _| map_str(v, "lower", str::to_lowercase))
        .register("upper", |v, _| map_str(v, "upper", str::to_uppercase))
        .register("capitalize", |v, _| map_str(v, "capitalize", capitalize))
        .register("title", |v, _| map_str(v, "title", title))
        .register("len", len)
        .register("keys", keys)
        .register("values", values)
        .register("concat", concat)
        .register("sort", sort)
        .register("index", index)
        .register("slice", slice)
        .register("split", split);
}

fn type_name(value: &Value) -> &'static str {
    JsonType::from_value(value).as_str()
}

fn unsupported(name: &str, value: &Value) -> CastError {
    CastError::new(format!("`{name}` is not supported for {} values", type_name(value)))
}

fn to_str(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    Ok(Value::String(value_to_text(value)))
}

fn to_int(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    if is_falsy(value) {
        return Ok(value.clone());
    }
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(0.0).trunc();
            if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Value::from(f as i64))
            } else {
                Err(CastError::new(format!("{n} does not fit an integer")))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| CastError::new(format!("invalid literal for int: `{s}` ({e})"))),
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        other => Err(unsupported("int", other)),
    }
}

fn to_float(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    if is_falsy(value) {
        return Ok(value.clone());
    }
    let f = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CastError::new(format!("could not convert `{s}` to float ({e})")))?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        other => return Err(unsupported("float", other)),
    };
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| CastError::new(format!("{f} is not a finite number")))
}

fn to_bool(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    match value {
        Value::Null => Ok(Value::Bool(false)),
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(_) | Value::String(_) => {
            let text = value_to_text(value).trim().to_lowercase();
            if TRUTHY.contains(&text.as_str()) {
                Ok(Value::Bool(true))
            } else if FALSEY.contains(&text.as_str()) {
                Ok(Value::Bool(false))
            } else {
                Err(CastError::new(format!("don't know how to convert `{text}` to bool")))
            }
        }
        other => Err(unsupported("bool", other)),
    }
}

fn to_datetime(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    if is_falsy(value) {
        return Ok(value.clone());
    }
    match value {
        Value::String(s) => {
            datetime::parse_datetime(s).map(|dt| Value::String(datetime::format_datetime(dt)))
        }
        other => Err(unsupported("dt", other)),
    }
}

fn strip(value: &Value, arg: Option<&str>) -> Result<Value, CastError> {
    let Value::String(s) = value else {
        return Err(unsupported("strip", value));
    };
    let stripped = match arg {
        Some(chars) if !chars.is_empty() => s.trim_matches(|c: char| chars.contains(c)),
        _ => s.trim(),
    };
    Ok(Value::String(stripped.to_string()))
}

fn map_str(value: &Value, name: &str, f: impl Fn(&str) -> String) -> Result<Value, CastError> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(unsupported(name, other)),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn len(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    let n = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => return Err(unsupported("len", other)),
    };
    Ok(Value::from(n))
}

fn keys(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    match value {
        Value::Object(map) => Ok(Value::Array(map.keys().cloned().map(Value::String).collect())),
        other => Err(unsupported("keys", other)),
    }
}

fn values(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    match value {
        Value::Object(map) => Ok(Value::Array(map.values().cloned().collect())),
        other => Err(unsupported("values", other)),
    }
}

/// Concatenate nested sequences one level deep.
fn concat(value: &Value, _: Option<&str>) -> Result<Value, CastError> {
    let Value::Array(items) = value else {
        return Err(unsupported("concat", value));
    };
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::Array(out))
}

/// Sort a sequence, optionally by a sub-field (`sort:name`, `sort:-name`).
fn sort(value: &Value, arg: Option<&str>) -> Result<Value, CastError> {
    let Value::Array(items) = value else {
        return Err(unsupported("sort", value));
    };
    Ok(Value::Array(sort_items(items.clone(), arg.unwrap_or(""))))
}

/// Sort values, by a sub-field when `by` is non-empty.
///
/// A leading `-` sorts descending and `+` ascending. Elements lacking the
/// sub-field are placed first when ascending and last when descending.
pub fn sort_items(mut items: Vec<Value>, by: &str) -> Vec<Value> {
    let (key, reverse) = match by.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (by.strip_prefix('+').unwrap_or(by), false),
    };

    if key.is_empty() {
        items.sort_by(compare_values);
        if reverse {
            items.reverse();
        }
        return items;
    }

    let (mut keyed, missing): (Vec<Value>, Vec<Value>) = items
        .into_iter()
        .partition(|item| item.get(key).map_or(false, |v| !v.is_null()));
    keyed.sort_by(|a, b| {
        let ord = compare_values(&a[key], &b[key]);
        if reverse {
            ord.reverse()
        } else {
            ord
        }
    });

    if reverse {
        keyed.extend(missing);
        keyed
    } else {
        let mut out = missing;
        out.extend(keyed);
        out
    }
}

fn parse_int_arg(name: &str, arg: Option<&str>) -> Result<i64, CastError> {
    let arg = arg.ok_or_else(|| CastError::new(format!("`{name}` requires an argument")))?;
    arg.trim()
        .parse()
        .map_err(|_| CastError::new(format!("`{name}` argument `{arg}` is not an integer")))
}

/// Resolve a Python-style possibly negative position against `len`.
fn resolve_position(pos: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let pos = if pos < 0 { len + pos } else { pos };
    (0..len).contains(&pos).then(|| pos as usize)
}

fn clamp_position(pos: i64, len: usize) -> usize {
    let ilen = i64::try_from(len).unwrap_or(i64::MAX);
    let pos = if pos < 0 { (ilen + pos).max(0) } else { pos.min(ilen) };
    pos as usize
}

fn index(value: &Value, arg: Option<&str>) -> Result<Value, CastError> {
    let pos = parse_int_arg("index", arg)?;
    let Value::Array(items) = value else {
        return Err(unsupported("index", value));
    };
    resolve_position(pos, items.len())
        .and_then(|idx| items.get(idx))
        .cloned()
        .ok_or_else(|| CastError::new(format!("index {pos} out of range for {} items", items.len())))
}

/// `slice:N` keeps the first N items (negative N drops from the end);
/// `slice:A:B` keeps items A through B-1.
fn slice(value: &Value, arg: Option<&str>) -> Result<Value, CastError> {
    let raw = arg.ok_or_else(|| CastError::new("`slice` requires an argument"))?;
    let (start, end) = match raw.split_once(':') {
        Some((start, end)) => (
            if start.trim().is_empty() { None } else { Some(parse_int_arg("slice", Some(start))?) },
            if end.trim().is_empty() { None } else { Some(parse_int_arg("slice", Some(end))?) },
        ),
        None => (None, Some(parse_int_arg("slice", Some(raw))?)),
    };

    let bounds = |len: usize| {
        let from = start.map_or(0, |s| clamp_position(s, len));
        let to = end.map_or(len, |e| clamp_position(e, len));
        (from, to.max(from))
    };

    match value {
        Value::Array(items) => {
            let (from, to) = bounds(items.len());
            Ok(Value::Array(items[from..to].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = bounds(chars.len());
            Ok(Value::String(chars[from..to].iter().collect()))
        }
        other => Err(unsupported("slice", other)),
    }
}

fn split(value: &Value, arg: Option<&str>) -> Result<Value, CastError> {
    let Value::String(s) = value else {
        return Err(unsupported("split", value));
    };
    let sep = arg.filter(|a| !a.is_empty()).unwrap_or(",");
    Ok(Value::Array(
        s.split(sep)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}
