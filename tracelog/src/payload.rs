//! Helpers for probing loosely-shaped JSON payloads.

use serde_json::Value;

/// Walk `path` into `payload` and return the value there, if any.
pub fn payload_at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = payload;
    for key in path {
        current = current.get(*key)?;
    }
    Some(current)
}

pub fn payload_str<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a str> {
    payload_at(payload, path)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// First non-empty string found at any of `paths`.
pub fn first_str<'a>(payload: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths.iter().find_map(|path| payload_str(payload, path))
}

/// Length of the first non-empty array found at any of `paths`.
///
/// Empty arrays are skipped so that a producer which always emits the key
/// does not hide a populated alternative.
pub fn first_array_len(payload: &Value, paths: &[&[&str]]) -> Option<usize> {
    paths
        .iter()
        .filter_map(|path| payload_at(payload, path).and_then(Value::as_array))
        .map(Vec::len)
        .find(|len| *len > 0)
}

/// Render a payload for a log line: strings as-is, everything else as JSON.
pub fn render_value(value: &Value, pretty: bool) -> String {
    match value {
        Value::String(s) => s.clone(),
        other if pretty => {
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        }
        other => other.to_string(),
    }
}

/// Render a payload as JSON, quoting plain strings too.
pub fn render_json(value: &Value, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Keep the first `len` characters of `id`, marking the cut with `...`.
pub fn truncate_id(id: &str, len: usize) -> String {
    if id.chars().count() <= len {
        id.to_string()
    } else {
        let head: String = id.chars().take(len).collect();
        format!("{head}...")
    }
}
