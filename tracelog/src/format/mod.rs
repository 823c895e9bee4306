//! Node-type formatting.
//!
//! Every trace event surviving the turn filter is turned into zero or more
//! log lines. The node-specific part comes from the rule table in
//! [`rules`]; tool calls, tool results, streamed LLM content and final
//! results are checked on every event regardless of its type.

pub mod rules;

use std::collections::HashSet;

use serde_json::Value;
use trace_types::{LogEntry, TraceEvent};

use crate::nodes::{NodeDirectory, UNKNOWN_NODE};
use crate::payload::{render_json, render_value};
use crate::turn::turn_label;

pub use rules::{rule_for, NodeRule, NODE_RULES};

pub const DEFAULT_SHORT_ID_LEN: usize = 8;

const ICON_PROGRESS: &str = "⏳";
const ICON_UPDATE: &str = "🔧";
const ICON_LLM: &str = "💬";
const ICON_TOOL_CALL: &str = "🛠️";
const ICON_TOOL_RESULT: &str = "📦";
const ICON_FINAL: &str = "✅";

/// Rendering knobs for formatted lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Characters of an identifier kept when it is shown truncated
    pub short_id_len: usize,
    /// Pretty-print structured payloads (compact single-line JSON otherwise)
    pub pretty_payloads: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            short_id_len: DEFAULT_SHORT_ID_LEN,
            pretty_payloads: true,
        }
    }
}

/// Read-only inputs shared by every rule during one formatting pass.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    /// The whole trace stream, for lookback across nodes
    pub stream: &'a [TraceEvent],
    pub nodes: NodeDirectory<'a>,
    pub options: &'a FormatOptions,
    /// Entry time for events without their own timestamp
    pub fallback_time: &'a str,
}

/// One event handed to a rule, with its position in the full stream.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub event: &'a TraceEvent,
    pub position: usize,
    pub ctx: FormatContext<'a>,
}

impl<'a> RuleInput<'a> {
    pub fn time(&self) -> &'a str {
        self.event
            .timestamp
            .as_deref()
            .unwrap_or(self.ctx.fallback_time)
    }

    pub fn node_label(&self) -> String {
        self.ctx.nodes.display_name(self.event)
    }

    /// Events earlier in the stream, nearest first.
    pub fn earlier_events(&self) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        let stream: &'a [TraceEvent] = self.ctx.stream;
        let end = self.position.min(stream.len());
        stream[..end].iter().rev()
    }

    /// Render a structured payload the way the options ask for.
    pub fn render(&self, value: &Value) -> String {
        render_value(value, self.ctx.options.pretty_payloads)
    }

    pub fn render_json(&self, value: &Value) -> String {
        render_json(value, self.ctx.options.pretty_payloads)
    }

    /// Build one line: `#<turn> <icon> [<node>] <title>` plus an optional body.
    pub fn line(&self, icon: &str, title: &str, body: Option<String>) -> LogEntry {
        let mut text = format!(
            "{}{} [{}] {}",
            turn_label(self.event.turn),
            icon,
            self.node_label(),
            title
        );
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            text.push('\n');
            text.push_str(&body);
        }
        LogEntry::text(self.time(), text)
    }
}

/// Format `events` (stream position, event) in order.
pub fn format_events(events: &[(usize, &TraceEvent)], ctx: FormatContext<'_>) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    let mut emitted_once: HashSet<(String, Option<i64>)> = HashSet::new();

    for &(position, event) in events {
        let input = RuleInput {
            event,
            position,
            ctx,
        };
        let rule = rule_for(event.node_type.as_str());

        if let Some(rule) = rule.filter(|rule| rule.once_per_turn) {
            let key = (
                event.resolved_node_id().unwrap_or_default().to_string(),
                event.turn,
            );
            if !emitted_once.insert(key) {
                tracing::trace!(
                    node_type = rule.node_type,
                    node = event.resolved_node_id().unwrap_or(UNKNOWN_NODE),
                    turn = ?event.turn,
                    "Suppressed repeated output event"
                );
                continue;
            }
        }

        match rule {
            Some(rule) => entries.extend((rule.render)(rule, &input)),
            None => entries.extend(unmatched_type_lines(&input)),
        }
        entries.extend(common_field_lines(&input));
    }

    entries
}

/// Lines for node types without a rule of their own.
fn unmatched_type_lines(input: &RuleInput<'_>) -> Vec<LogEntry> {
    let event = input.event;
    let mut lines = Vec::new();

    if let Some(progress) = event.progress.as_deref().filter(|p| !p.is_empty()) {
        lines.push(input.line(ICON_PROGRESS, progress, None));
    }
    if let Some(updates) = &event.updates {
        let node_type = match event.node_type.as_str() {
            "" => UNKNOWN_NODE,
            other => other,
        };
        lines.push(input.line(
            ICON_UPDATE,
            &format!("업데이트 ({node_type})"),
            Some(input.render(updates)),
        ));
    }

    lines
}

/// Type-independent fields checked on every event.
fn common_field_lines(input: &RuleInput<'_>) -> Vec<LogEntry> {
    let event = input.event;
    let mut lines = Vec::new();

    if let Some(content) = event
        .llm_streaming_content
        .as_deref()
        .filter(|c| !c.is_empty())
    {
        lines.push(input.line(ICON_LLM, "LLM 응답", Some(content.to_string())));
    }
    if let Some(calls) = &event.tool_calls {
        lines.push(input.line(ICON_TOOL_CALL, "도구 호출", Some(input.render_json(calls))));
    }
    if let Some(result) = &event.tool_result {
        lines.push(input.line(
            ICON_TOOL_RESULT,
            "도구 결과",
            Some(input.render_json(result)),
        ));
    }
    if let Some(result) = &event.final_result {
        lines.push(input.line(ICON_FINAL, "최종 결과", Some(input.render(result))));
    }

    lines
}
