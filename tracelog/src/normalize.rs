//! Final shaping of log entries for display.
//!
//! Payloads arrive as plain strings, structured objects, JSON-encoded
//! strings, or nothing at all. This stage folds them into one schema,
//! numbers the entries from 1, and re-parses JSON strings so the viewer can
//! pretty-print them. It never fails: a string that is not JSON stays a
//! string.

use serde_json::Value;
use trace_types::{DisplayEntry, LogEntry, RawLogRecord};

/// Normalize formatted entries.
pub fn normalize_entries(entries: Vec<LogEntry>) -> Vec<DisplayEntry> {
    number(entries.into_iter().map(|entry| (entry.time, entry.log)))
}

/// Normalize run-log records. Records without a time get `fallback_time`.
pub fn normalize_records(records: &[&RawLogRecord], fallback_time: &str) -> Vec<DisplayEntry> {
    number(records.iter().map(|record| {
        let time = if record.time.is_empty() {
            fallback_time.to_string()
        } else {
            record.time.clone()
        };
        (time, record.log.clone())
    }))
}

/// Normalize pass-through items from a node's own log.
///
/// Objects with a `log` key contribute their `log` and `time`; any other
/// item is itself the log line.
pub fn normalize_passthrough(items: &[Value], fallback_time: &str) -> Vec<DisplayEntry> {
    number(items.iter().map(|item| match item {
        Value::Object(obj) if obj.contains_key("log") => {
            let time = obj
                .get("time")
                .or_else(|| obj.get("timestamp"))
                .and_then(Value::as_str)
                .unwrap_or(fallback_time)
                .to_string();
            (time, obj.get("log").cloned().unwrap_or(Value::Null))
        }
        other => (fallback_time.to_string(), other.clone()),
    }))
}

fn number(entries: impl Iterator<Item = (String, Value)>) -> Vec<DisplayEntry> {
    entries
        .enumerate()
        .map(|(idx, (time, log))| DisplayEntry {
            index: idx + 1,
            time,
            log: normalize_log(log),
        })
        .collect()
}

/// Unify one payload: JSON strings are parsed, null becomes `""`.
pub fn normalize_log(log: Value) -> Value {
    match log {
        Value::Null => Value::String(String::new()),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_log_parses_json_strings() {
        assert_eq!(normalize_log(json!("{\"a\": 1}")), json!({"a": 1}));
        assert_eq!(normalize_log(json!("[1, 2]")), json!([1, 2]));
    }

    #[test]
    fn test_normalize_log_keeps_plain_strings() {
        assert_eq!(normalize_log(json!("#1 📚 [N1] 지식 검색")), json!("#1 📚 [N1] 지식 검색"));
        assert_eq!(normalize_log(json!("{broken")), json!("{broken"));
        assert_eq!(normalize_log(json!("")), json!(""));
    }

    #[test]
    fn test_normalize_log_null_becomes_empty_string() {
        assert_eq!(normalize_log(Value::Null), json!(""));
    }

    #[test]
    fn test_normalize_log_passes_structures_through() {
        let value = json!({"nested": {"k": [1, null]}});
        assert_eq!(normalize_log(value.clone()), value);
        assert_eq!(normalize_log(json!(7)), json!(7));
    }

    #[test]
    fn test_entries_are_numbered_from_one() {
        let entries = vec![
            LogEntry::text("t1", "first"),
            LogEntry::text("t2", "{\"second\": true}"),
        ];
        let display = normalize_entries(entries);

        assert_eq!(display.len(), 2);
        assert_eq!(display[0].index, 1);
        assert_eq!(display[0].log, json!("first"));
        assert_eq!(display[1].index, 2);
        assert_eq!(display[1].time, "t2");
        assert_eq!(display[1].log, json!({"second": true}));
    }

    #[test]
    fn test_passthrough_items() {
        let items = vec![
            json!({"time": "10:00", "log": "{\"step\": 1}"}),
            json!({"log": null}),
            json!("bare line"),
            json!({"message": "no log key"}),
        ];
        let display = normalize_passthrough(&items, "now");

        assert_eq!(display[0].time, "10:00");
        assert_eq!(display[0].log, json!({"step": 1}));
        assert_eq!(display[1].time, "now");
        assert_eq!(display[1].log, json!(""));
        assert_eq!(display[2].log, json!("bare line"));
        assert_eq!(display[3].log, json!({"message": "no log key"}));
        assert_eq!(display[3].index, 4);
    }

    #[test]
    fn test_records_keep_their_time() {
        let record: RawLogRecord =
            serde_json::from_value(json!({"time": "09:59", "log": "[N1] ok"})).unwrap();
        let untimed: RawLogRecord = serde_json::from_value(json!("bare")).unwrap();
        let display = normalize_records(&[&record, &untimed], "now");
        assert_eq!(display[0].time, "09:59");
        assert_eq!(display[0].log, json!("[N1] ok"));
        assert_eq!(display[1].time, "now");
    }
}
