//! Source selection.
//!
//! Three inputs can describe the same run: the target node's own structured
//! log, the shared trace stream, and the flattened run-log buffer. They are
//! tried in that order as lazily evaluated providers; the first one to yield
//! a non-empty collection wins.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use trace_types::{LogRequest, LogSource, RawLogRecord, TraceEvent};

use crate::nodes::NodeDirectory;

/// The collection chosen for a request, still unfiltered.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSource<'a> {
    /// Pre-formatted items, used verbatim
    NodeLocal(&'a [Value]),
    /// Trace events with their position in the full stream
    TraceStream(Vec<(usize, &'a TraceEvent)>),
    RunLogBuffer(Vec<&'a RawLogRecord>),
}

impl ResolvedSource<'_> {
    pub fn source(&self) -> LogSource {
        match self {
            ResolvedSource::NodeLocal(_) => LogSource::NodeLocal,
            ResolvedSource::TraceStream(_) => LogSource::TraceStream,
            ResolvedSource::RunLogBuffer(_) => LogSource::RunLogBuffer,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResolvedSource::NodeLocal(items) => items.len(),
            ResolvedSource::TraceStream(events) => events.len(),
            ResolvedSource::RunLogBuffer(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Provider<'a> = Box<dyn Fn() -> Option<ResolvedSource<'a>> + 'a>;

/// Pick the single collection the log is rebuilt from.
///
/// Returns `None` when every tier is empty.
pub fn resolve_source<'a>(
    request: &'a LogRequest,
    nodes: NodeDirectory<'a>,
) -> Option<ResolvedSource<'a>> {
    let target = request
        .target_node_id
        .as_deref()
        .filter(|id| !id.trim().is_empty());

    let providers: Vec<Provider<'a>> = vec![
        Box::new(move || node_local(request, target)),
        Box::new(move || trace_stream(request, target, nodes)),
        Box::new(move || run_log_buffer(request, target, nodes)),
    ];

    let resolved = providers
        .iter()
        .find_map(|provider| provider().filter(|resolved| !resolved.is_empty()));

    match &resolved {
        Some(resolved) => tracing::debug!(
            target_node = target.unwrap_or("*"),
            source = %resolved.source(),
            items = resolved.len(),
            "Resolved log source"
        ),
        None => tracing::debug!(
            target_node = target.unwrap_or("*"),
            "No log source has entries"
        ),
    }

    resolved
}

fn node_local<'a>(request: &'a LogRequest, target: Option<&str>) -> Option<ResolvedSource<'a>> {
    target?;
    request
        .node_local_log
        .as_deref()
        .map(ResolvedSource::NodeLocal)
}

fn trace_stream<'a>(
    request: &'a LogRequest,
    target: Option<&str>,
    nodes: NodeDirectory<'a>,
) -> Option<ResolvedSource<'a>> {
    let events = request
        .trace_stream
        .iter()
        .enumerate()
        .filter(|(_, event)| target.map_or(true, |target| nodes.event_matches(event, target)))
        .collect::<Vec<_>>();
    Some(ResolvedSource::TraceStream(events))
}

fn run_log_buffer<'a>(
    request: &'a LogRequest,
    target: Option<&str>,
    nodes: NodeDirectory<'a>,
) -> Option<ResolvedSource<'a>> {
    let all: Vec<&RawLogRecord> = request.run_log_buffer.iter().collect();
    let Some(target) = target else {
        return Some(ResolvedSource::RunLogBuffer(all));
    };

    let identities = nodes.identities(target);
    let matching: Vec<&RawLogRecord> = all
        .iter()
        .copied()
        .filter(|record| {
            record_node_name(record).is_some_and(|name| identities.iter().any(|id| *id == name))
        })
        .collect();

    if matching.is_empty() {
        // An over-eager filter must not hide the whole log while debugging.
        tracing::debug!(
            target_node = target,
            records = all.len(),
            "No run-log records matched target; using unfiltered buffer"
        );
        return Some(ResolvedSource::RunLogBuffer(all));
    }
    Some(ResolvedSource::RunLogBuffer(matching))
}

/// Node a run-log record belongs to: its declared `nodeName`, otherwise the
/// leading `[...]` token of the log line.
pub fn record_node_name(record: &RawLogRecord) -> Option<&str> {
    if let Some(name) = record.node_name.as_deref() {
        return Some(name);
    }
    let line = record.log.as_str()?;
    bracket_tag_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn bracket_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[([^\]]+)\]").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trace_types::NodeDescriptor;

    fn request(value: Value) -> LogRequest {
        serde_json::from_value(value).unwrap()
    }

    fn resolve(request: &LogRequest) -> Option<ResolvedSource<'_>> {
        resolve_source(request, NodeDirectory::new(&request.node_descriptors))
    }

    #[test]
    fn test_node_local_log_wins_when_targeted() {
        let req = request(json!({
            "targetNodeId": "N1",
            "nodeLocalLog": [{"time": "t", "log": "local"}],
            "traceStream": [{"nodeId": "N1", "nodeType": "condition", "updates": {}}],
            "runLogBuffer": [{"time": "t", "log": "[N1] raw"}],
        }));
        let resolved = resolve(&req).unwrap();
        assert_eq!(resolved.source(), LogSource::NodeLocal);
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_node_local_log_ignored_for_whole_run() {
        let req = request(json!({
            "nodeLocalLog": [{"time": "t", "log": "local"}],
            "traceStream": [{"nodeId": "N1", "nodeType": "condition"}],
        }));
        assert_eq!(resolve(&req).unwrap().source(), LogSource::TraceStream);
    }

    #[test]
    fn test_empty_node_local_log_falls_through() {
        let req = request(json!({
            "targetNodeId": "N1",
            "nodeLocalLog": [],
            "traceStream": [
                {"nodeId": "N2", "nodeType": "condition"},
                {"nodeId": "N1", "nodeType": "condition"},
            ],
        }));
        match resolve(&req).unwrap() {
            ResolvedSource::TraceStream(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].0, 1);
            }
            other => panic!("expected trace stream, got {other:?}"),
        }
    }

    #[test]
    fn test_trace_stream_without_target_events_falls_back_to_run_log() {
        let req = request(json!({
            "targetNodeId": "N1",
            "traceStream": [{"nodeId": "N2", "nodeType": "condition"}],
            "runLogBuffer": [
                {"time": "t1", "log": "[N2] other"},
                {"time": "t2", "log": "[N1] mine"},
                {"time": "t3", "log": "plain", "nodeName": "N1"},
            ],
        }));
        match resolve(&req).unwrap() {
            ResolvedSource::RunLogBuffer(records) => {
                let times: Vec<&str> = records.iter().map(|r| r.time.as_str()).collect();
                assert_eq!(times, vec!["t2", "t3"]);
            }
            other => panic!("expected run log, got {other:?}"),
        }
    }

    #[test]
    fn test_run_log_filter_falls_back_to_unfiltered() {
        let req = request(json!({
            "targetNodeId": "N9",
            "runLogBuffer": [
                {"time": "t1", "log": "[N2] other"},
                {"time": "t2", "log": "no tag"},
            ],
        }));
        let resolved = resolve(&req).unwrap();
        assert_eq!(resolved.source(), LogSource::RunLogBuffer);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_run_log_filter_uses_descriptor_name() {
        let mut req = request(json!({
            "targetNodeId": "N1",
            "runLogBuffer": [
                {"time": "t1", "log": "[Product Docs] searching"},
                {"time": "t2", "log": "[Answer] writing"},
            ],
        }));
        req.node_descriptors = vec![NodeDescriptor {
            id: "N1".to_string(),
            name: "Product Docs".to_string(),
            ..NodeDescriptor::default()
        }];
        let resolved = resolve(&req).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_all_tiers_empty_resolves_to_none() {
        let req = request(json!({"targetNodeId": "N1"}));
        assert!(resolve(&req).is_none());
        assert!(resolve(&LogRequest::default()).is_none());
    }

    #[test]
    fn test_record_node_name_prefers_declared_field() {
        let record: RawLogRecord =
            serde_json::from_value(json!({"log": "[Tagged] line", "nodeName": "Declared"})).unwrap();
        assert_eq!(record_node_name(&record), Some("Declared"));

        let record: RawLogRecord = serde_json::from_value(json!({"log": "  [ Tagged ] line"})).unwrap();
        assert_eq!(record_node_name(&record), Some("Tagged"));

        let record: RawLogRecord = serde_json::from_value(json!({"log": {"msg": "[x]"}})).unwrap();
        assert_eq!(record_node_name(&record), None);
    }
}
