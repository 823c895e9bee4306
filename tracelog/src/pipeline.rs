//! End-to-end log reconstruction.
//!
//! resolve source -> scope to a turn -> format per node type -> normalize.
//! Every invocation starts from scratch; nothing is cached between calls.

use trace_types::{LogRequest, RunLog};

use crate::format::{format_events, FormatContext, FormatOptions};
use crate::nodes::NodeDirectory;
use crate::normalize::{normalize_entries, normalize_passthrough, normalize_records};
use crate::source::{resolve_source, ResolvedSource};
use crate::turn::{filter_latest_turn, filter_to_turn, TurnScoped};

/// Rebuild the displayable log for `request`.
pub fn build_run_log(request: &LogRequest, options: &FormatOptions) -> RunLog {
    let nodes = NodeDirectory::new(&request.node_descriptors);
    let Some(resolved) = resolve_source(request, nodes) else {
        return RunLog::empty();
    };

    let source = resolved.source();
    let fallback_time = request.generated_at.as_str();
    let entries = match resolved {
        // Already scoped to one node and already formatted.
        ResolvedSource::NodeLocal(items) => normalize_passthrough(items, fallback_time),
        ResolvedSource::TraceStream(events) => {
            let scoped = scope_turn(events, request.turn);
            let ctx = FormatContext {
                stream: &request.trace_stream,
                nodes,
                options,
                fallback_time,
            };
            normalize_entries(format_events(&scoped, ctx))
        }
        ResolvedSource::RunLogBuffer(records) => {
            normalize_records(&scope_turn(records, request.turn), fallback_time)
        }
    };

    tracing::debug!(
        target_node = request.target_node_id.as_deref().unwrap_or("*"),
        source = %source,
        entries = entries.len(),
        "Rebuilt run log"
    );

    RunLog { source, entries }
}

fn scope_turn<T: TurnScoped>(items: Vec<T>, turn: Option<i64>) -> Vec<T> {
    match turn {
        Some(turn) => filter_to_turn(items, turn),
        None => filter_latest_turn(items),
    }
}
