// SPDX-License-Identifier: MPL-2.0

//! Identifier comparison.
//!
//! Ids arrive as numbers from some endpoints and strings from others, and are
//! sometimes embedded in a user object. Two ids are equal when their string
//! forms match case-insensitively.

use serde_json::Value;

/// Fields checked, in order, when an id is embedded in an object.
const ID_FIELDS: &[&str] = &["_id", "id", "userId", "username"];

/// Resolve the string form of an id from a scalar or an object.
pub fn resolve_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ID_FIELDS
            .iter()
            .filter_map(|field| map.get(*field))
            .find_map(scalar_id),
        _ => None,
    }
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Compare two raw ids using the case-insensitive string rule.
pub fn same_id(a: &Value, b: &Value) -> bool {
    match (resolve_id(a), resolve_id(b)) {
        (Some(a), Some(b)) => same_id_str(&a, &b),
        _ => false,
    }
}

/// Same rule for ids already in string form.
pub fn same_id_str(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}
