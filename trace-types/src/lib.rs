//! Shared types between the log engine and the log viewer
//!
//! These types are used by both:
//! - the `tracelog` reconstruction engine (native Rust)
//! - the viewer frontend (TypeScript bindings via ts-rs)
//!
//! Input shapes are deserialized leniently: trace producers disagree on field
//! names, so every input type is built from a raw JSON value by probing
//! candidate keys in a fixed order. A missing or oddly-typed field falls back
//! to its default instead of failing the whole snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

// ============================================================================
// Node Types
// ============================================================================

pub const NODE_TYPE_INPUT_BASIC: &str = "input__basic";
pub const NODE_TYPE_REWRITER_HYDE: &str = "retriever__rewriter_hyde";
pub const NODE_TYPE_KNOWLEDGE: &str = "retriever__knowledge";
pub const NODE_TYPE_RERANKER: &str = "retriever__reranker";
pub const NODE_TYPE_COMPRESSOR: &str = "retriever__compressor";
pub const NODE_TYPE_FILTER: &str = "retriever__filter";
pub const NODE_TYPE_GENERATOR: &str = "agent__generator";
pub const NODE_TYPE_REVIEWER: &str = "agent__reviewer";
pub const NODE_TYPE_CATEGORIZER: &str = "agent__categorizer";
pub const NODE_TYPE_CODER: &str = "agent__coder";
pub const NODE_TYPE_OUTPUT_CHAT: &str = "output__chat";
pub const NODE_TYPE_OUTPUT_KEYS: &str = "output__keys";
pub const NODE_TYPE_OUTPUT_SELECTOR: &str = "output__selector";
pub const NODE_TYPE_OUTPUT_FORMATTER: &str = "output__formatter";
pub const NODE_TYPE_UNION: &str = "union";
pub const NODE_TYPE_UNION_1: &str = "union_1";
pub const NODE_TYPE_MERGER: &str = "merger";
pub const NODE_TYPE_CONDITION: &str = "condition";

// ============================================================================
// Trace Inputs
// ============================================================================

/// TraceEvent - one observation emitted by a graph node during a turn
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct TraceEvent {
    /// Producing node's identifier, when the source populated it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// Producing node's display name, when the source populated it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Graph node kind (e.g. "agent__generator"); empty when absent
    pub node_type: String,

    /// 1-based execution round; `None` matches any turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_streaming_content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<Value>,

    /// The node's structured output for this turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<Value>,
}

impl TraceEvent {
    /// Resolved node identifier: the id when populated, otherwise the name.
    pub fn resolved_node_id(&self) -> Option<&str> {
        self.node_id
            .as_deref()
            .or(self.node_name.as_deref())
            .filter(|id| !id.is_empty())
    }

}

impl From<Value> for TraceEvent {
    fn from(value: Value) -> Self {
        let Value::Object(obj) = value else {
            return Self::default();
        };

        Self {
            node_id: first_string(&obj, &["nodeId", "node_id", "id"]),
            node_name: first_string(&obj, &["nodeName", "node_name", "name"]),
            node_type: first_string(&obj, &["nodeType", "node_type", "type"]).unwrap_or_default(),
            turn: obj.get("turn").and_then(turn_number),
            timestamp: first_string(&obj, &["timestamp", "time"]),
            progress: first_string(&obj, &["progress"]),
            llm_streaming_content: first_string(
                &obj,
                &["llmStreamingContent", "llm_streaming_content"],
            ),
            tool_calls: first_present(&obj, &["toolCalls", "tool_calls"]),
            tool_result: first_present(&obj, &["toolResult", "tool_result"]),
            updates: first_present(&obj, &["updates"]),
            final_result: first_present(&obj, &["finalResult", "final_result"]),
        }
    }
}

/// NodeDescriptor - a graph node's current metadata, used for enrichment only
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct NodeDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Type-specific configuration (e.g. a knowledge retriever's repository)
    pub config: Value,
}

impl NodeDescriptor {
    /// String field `key` of the node's configuration.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<Value> for NodeDescriptor {
    fn from(value: Value) -> Self {
        let Value::Object(obj) = value else {
            return Self::default();
        };

        let config = first_present(&obj, &["config", "data"]).unwrap_or(Value::Null);
        let name = first_string(&obj, &["name", "label"])
            .or_else(|| {
                config
                    .get("label")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
            })
            .unwrap_or_default();

        Self {
            id: first_string(&obj, &["id", "nodeId", "node_id"]).unwrap_or_default(),
            name,
            node_type: first_string(&obj, &["type", "nodeType", "node_type"]).unwrap_or_default(),
            config,
        }
    }
}

/// RawLogRecord - an already-flattened line from the global run-log buffer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct RawLogRecord {
    pub time: String,
    pub log: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<i64>,
}

impl From<Value> for RawLogRecord {
    fn from(value: Value) -> Self {
        let obj = match value {
            Value::Object(obj) => obj,
            // Bare lines are legal in older buffers.
            other => {
                return Self {
                    log: other,
                    ..Self::default()
                }
            }
        };

        Self {
            time: first_string(&obj, &["time", "timestamp"]).unwrap_or_default(),
            log: first_present(&obj, &["log", "message"]).unwrap_or(Value::Null),
            node_name: first_string(&obj, &["nodeName", "node_name"]),
            turn: obj.get("turn").and_then(turn_number),
        }
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// All inputs of one reconstruction, as read-only snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogRequest {
    /// Selected node; `None` asks for the whole-run log
    #[serde(
        alias = "target_node_id",
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_node_id: Option<String>,

    /// Pre-formatted log carried in the target node's runtime state
    #[serde(
        alias = "node_local_log",
        deserialize_with = "lenient_opt_vec",
        skip_serializing_if = "Option::is_none"
    )]
    pub node_local_log: Option<Vec<Value>>,

    #[serde(alias = "trace_stream", deserialize_with = "lenient_vec")]
    pub trace_stream: Vec<TraceEvent>,

    #[serde(alias = "run_log_buffer", deserialize_with = "lenient_vec")]
    pub run_log_buffer: Vec<RawLogRecord>,

    #[serde(
        alias = "node_descriptors",
        alias = "nodes",
        deserialize_with = "lenient_vec"
    )]
    pub node_descriptors: Vec<NodeDescriptor>,

    /// Show this turn instead of the latest one
    #[serde(deserialize_with = "lenient_turn", skip_serializing_if = "Option::is_none")]
    pub turn: Option<i64>,

    /// Caller's clock reading, used for events that carry no timestamp
    #[serde(alias = "generated_at", deserialize_with = "lenient_string")]
    pub generated_at: String,
}

// Snapshot fields that are null or of the wrong shape fall back to their
// defaults instead of rejecting the whole request.

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<Value>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(T::from).collect(),
        _ => Vec::new(),
    })
}

fn lenient_opt_vec<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items),
        _ => None,
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_string(&Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_string(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_turn<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(turn_number(&Value::deserialize(deserializer)?))
}

// ============================================================================
// Log Outputs
// ============================================================================

/// LogEntry - one formatted line before normalization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub log: Value,
}

impl LogEntry {
    pub fn text(time: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            log: Value::String(text.into()),
        }
    }
}

/// DisplayEntry - one normalized, numbered line ready for the viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "trace_types.ts")]
pub struct DisplayEntry {
    /// 1-based position in the log
    #[ts(type = "number")]
    pub index: usize,
    pub time: String,
    #[ts(type = "unknown")]
    pub log: Value,
}

/// Which input the reconstructed log was taken from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "trace_types.ts")]
pub enum LogSource {
    NodeLocal,
    TraceStream,
    RunLogBuffer,
    /// Nothing to show at any tier
    Empty,
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSource::NodeLocal => write!(f, "node_local"),
            LogSource::TraceStream => write!(f, "trace_stream"),
            LogSource::RunLogBuffer => write!(f, "run_log_buffer"),
            LogSource::Empty => write!(f, "empty"),
        }
    }
}

/// RunLog - the reconstructed log for a run or a single node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "trace_types.ts")]
pub struct RunLog {
    pub source: LogSource,
    pub entries: Vec<DisplayEntry>,
}

impl RunLog {
    pub fn empty() -> Self {
        Self {
            source: LogSource::Empty,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DisplayEntry> {
        self.entries
    }
}

// ============================================================================
// Field Probing
// ============================================================================

/// Read a turn counter. Non-numeric values count as "no turn".
pub fn turn_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

/// First key in `keys` holding a non-null value.
fn first_present(obj: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
        .cloned()
}

/// First key in `keys` holding a non-empty scalar, rendered as a string.
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(scalar_string)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
