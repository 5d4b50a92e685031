//! Tolerant accessors over loosely shaped JSON.

use serde_json::{Map, Value};

const FALSE_WORDS: &[&str] = &[
    "", "false", "0", "no", "n", "nao", "não", "off", "disabled", "inativo", "null",
];

/// A boolean the source actually stated. `None` for null, containers and
/// anything else that carries no yes/no meaning.
pub fn explicit_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
        // Any string that is not a recognized "no" counts as yes.
        Value::String(s) => Some(!FALSE_WORDS.contains(&s.trim().to_lowercase().as_str())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        other => explicit_bool(other).unwrap_or(false),
    }
}

/// First non-null value among `keys`.
pub fn first_value<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// First non-empty string (numbers are stringified) among `keys`.
pub fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(scalar_string)
}

/// First explicit boolean among `keys`.
pub fn first_bool(map: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(explicit_bool)
}

pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Strings named by a value: a scalar, a list of scalars, or the keys of an
/// object whose values are truthy.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        Value::Object(map) => map
            .iter()
            .filter(|(_, flag)| is_truthy(flag))
            .map(|(key, _)| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}
