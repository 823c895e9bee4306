//! Per-node-type formatting rules.
//!
//! One row per supported node kind. Adding a kind means adding a row; the
//! formatting loop never branches on type names itself.

use serde_json::Value;
use trace_types::{
    LogEntry, TraceEvent, NODE_TYPE_CATEGORIZER, NODE_TYPE_CODER, NODE_TYPE_COMPRESSOR,
    NODE_TYPE_CONDITION, NODE_TYPE_FILTER, NODE_TYPE_GENERATOR, NODE_TYPE_INPUT_BASIC,
    NODE_TYPE_KNOWLEDGE, NODE_TYPE_MERGER, NODE_TYPE_OUTPUT_CHAT, NODE_TYPE_OUTPUT_FORMATTER,
    NODE_TYPE_OUTPUT_KEYS, NODE_TYPE_OUTPUT_SELECTOR, NODE_TYPE_RERANKER, NODE_TYPE_REVIEWER,
    NODE_TYPE_REWRITER_HYDE, NODE_TYPE_UNION, NODE_TYPE_UNION_1,
};

use super::RuleInput;
use crate::payload::{first_array_len, first_str, truncate_id};
use crate::turn::same_turn;

pub type RenderFn = fn(&NodeRule, &RuleInput<'_>) -> Vec<LogEntry>;

/// How one node kind is turned into log lines.
#[derive(Clone, Copy)]
pub struct NodeRule {
    pub node_type: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
    /// Emit at most once per (node, turn) within a formatting pass
    pub once_per_turn: bool,
    pub render: RenderFn,
}

impl std::fmt::Debug for NodeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRule")
            .field("node_type", &self.node_type)
            .field("icon", &self.icon)
            .field("label", &self.label)
            .field("once_per_turn", &self.once_per_turn)
            .finish()
    }
}

const fn rule(
    node_type: &'static str,
    icon: &'static str,
    label: &'static str,
    render: RenderFn,
) -> NodeRule {
    NodeRule {
        node_type,
        icon,
        label,
        once_per_turn: false,
        render,
    }
}

const fn output_rule(node_type: &'static str, icon: &'static str, label: &'static str) -> NodeRule {
    NodeRule {
        node_type,
        icon,
        label,
        once_per_turn: true,
        render: render_output,
    }
}

pub const NODE_RULES: &[NodeRule] = &[
    rule(NODE_TYPE_INPUT_BASIC, "📥", "입력 처리됨", render_input),
    rule(NODE_TYPE_REWRITER_HYDE, "✏️", "쿼리 재작성", render_rewrite),
    rule(NODE_TYPE_KNOWLEDGE, "📚", "지식 검색", render_knowledge),
    rule(NODE_TYPE_GENERATOR, "🤖", "답변 생성", render_generator),
    output_rule(NODE_TYPE_OUTPUT_CHAT, "📤", "채팅 출력"),
    output_rule(NODE_TYPE_OUTPUT_KEYS, "🔑", "키 출력"),
    output_rule(NODE_TYPE_OUTPUT_SELECTOR, "🎯", "선택 출력"),
    output_rule(NODE_TYPE_OUTPUT_FORMATTER, "🧾", "포맷 출력"),
    rule(NODE_TYPE_UNION, "🔗", "유니온", render_updates),
    rule(NODE_TYPE_UNION_1, "🔗", "유니온", render_updates),
    rule(NODE_TYPE_MERGER, "🔀", "병합", render_updates),
    rule(NODE_TYPE_CONDITION, "🚦", "조건 분기", render_updates),
    rule(NODE_TYPE_REVIEWER, "🧐", "검토", render_updates),
    rule(NODE_TYPE_CATEGORIZER, "🏷️", "분류", render_updates),
    rule(NODE_TYPE_RERANKER, "📊", "재순위화", render_updates),
    rule(NODE_TYPE_COMPRESSOR, "🗜️", "압축", render_updates),
    rule(NODE_TYPE_FILTER, "🧹", "필터", render_updates),
    rule(NODE_TYPE_CODER, "💻", "코드 생성", render_updates),
];

pub fn rule_for(node_type: &str) -> Option<&'static NodeRule> {
    NODE_RULES.iter().find(|rule| rule.node_type == node_type)
}

const MISSING: &str = "(없음)";
const ICON_WARNING: &str = "⚠️";

// Paths probed for retrieval results, in priority order.
const DOC_PATHS: &[&[&str]] = &[
    &["retrieved_docs"],
    &["output", "retrieved_docs"],
    &["result", "retrieved_docs"],
];
const CHUNK_PATHS: &[&[&str]] = &[
    &["data_chunks"],
    &["retrieved_chunks"],
    &["output", "data_chunks"],
    &["output", "retrieved_chunks"],
    &["result", "data_chunks"],
    &["result", "retrieved_chunks"],
];

const REWRITTEN_QUERY_PATHS: &[&[&str]] = &[
    &["rewritten_query"],
    &["hyde_query"],
    &["hypothetical_document"],
    &["output", "rewritten_query"],
    &["result", "rewritten_query"],
];
const ORIGINAL_QUERY_PATHS: &[&[&str]] = &[
    &["original_query"],
    &["query"],
    &["input", "query"],
];

const REPO_ID_KEYS: &[&str] = &["repo_id", "repository_id", "knowledge_id", "knowledge_base_id"];
const REPO_NAME_KEYS: &[&str] = &["repo_name", "repository_name", "knowledge_name"];
const REPO_KIND_KEYS: &[&str] = &["repo_type", "repository_type", "knowledge_type", "kind"];

fn render_input(rule: &NodeRule, input: &RuleInput<'_>) -> Vec<LogEntry> {
    let body = input.event.updates.as_ref().map(|u| input.render(u));
    vec![input.line(rule.icon, rule.label, body)]
}

fn render_updates(rule: &NodeRule, input: &RuleInput<'_>) -> Vec<LogEntry> {
    let event = input.event;
    let body = match (&event.updates, event.progress.as_deref()) {
        (Some(updates), _) => input.render(updates),
        (None, Some(progress)) if !progress.is_empty() => progress.to_string(),
        _ => return Vec::new(),
    };
    vec![input.line(rule.icon, rule.label, Some(body))]
}

fn render_output(rule: &NodeRule, input: &RuleInput<'_>) -> Vec<LogEntry> {
    let body = input.event.updates.as_ref().map(|u| input.render(u));
    vec![input.line(rule.icon, rule.label, body)]
}

fn render_rewrite(rule: &NodeRule, input: &RuleInput<'_>) -> Vec<LogEntry> {
    let sources = payload_sources(input.event);
    let rewritten = sources
        .iter()
        .find_map(|payload| first_str(payload, REWRITTEN_QUERY_PATHS));
    let original = sources
        .iter()
        .find_map(|payload| first_str(payload, ORIGINAL_QUERY_PATHS));

    let body = format!(
        "원본 쿼리: {}\n재작성 쿼리: {}",
        original.unwrap_or(MISSING),
        rewritten.unwrap_or(MISSING)
    );
    vec![input.line(rule.icon, rule.label, Some(body))]
}

fn render_knowledge(rule: &NodeRule, input: &RuleInput<'_>) -> Vec<LogEntry> {
    let knowledge = KnowledgeRef::from_event(input.event, input);
    let counts = RetrievalCounts::from_event(input.event);

    let mut lines = vec![input.line(
        rule.icon,
        rule.label,
        Some(format!(
            "지식: {}\n문서 {}개 · 청크 {}개",
            knowledge.describe(),
            counts.docs,
            counts.chunks
        )),
    )];
    if counts.is_empty() {
        lines.push(input.line(
            ICON_WARNING,
            &format!("검색된 문서가 없습니다 ({})", knowledge.name),
            None,
        ));
    }
    lines
}

fn render_generator(rule: &NodeRule, input: &RuleInput<'_>) -> Vec<LogEntry> {
    let event = input.event;
    let feeding = input
        .earlier_events()
        .filter(|earlier| same_turn(earlier.turn, event.turn))
        .find(|earlier| earlier.node_type == NODE_TYPE_KNOWLEDGE);

    let mut body = Vec::new();
    if let Some(retriever) = feeding {
        let knowledge = KnowledgeRef::from_event(retriever, input);
        let counts = RetrievalCounts::from_event(retriever);
        body.push(format!(
            "참조 지식: {} · 검색 결과 {}개",
            knowledge.describe(),
            counts.retrieved()
        ));
    }
    if let Some(updates) = &event.updates {
        body.push(input.render(updates));
    }
    if body.is_empty() {
        return Vec::new();
    }
    vec![input.line(rule.icon, rule.label, Some(body.join("\n")))]
}

/// Where structured results of an event may live: `updates`, then the raw
/// tool result (which some producers send as a JSON string).
fn payload_sources(event: &TraceEvent) -> Vec<Value> {
    let mut sources = Vec::new();
    if let Some(updates) = &event.updates {
        sources.push(updates.clone());
    }
    match &event.tool_result {
        Some(Value::String(raw)) => {
            if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                sources.push(parsed);
            }
        }
        Some(other) => sources.push(other.clone()),
        None => {}
    }
    sources
}

/// Knowledge base metadata for a `retriever__knowledge` event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KnowledgeRef {
    name: String,
    short_id: Option<String>,
    kind: Option<String>,
}

impl KnowledgeRef {
    fn from_event(event: &TraceEvent, input: &RuleInput<'_>) -> Self {
        let node = input.ctx.nodes.for_event(event);
        let config_str = |keys: &[&str]| -> Option<String> {
            let node = node?;
            keys.iter()
                .find_map(|key| node.config_str(key))
                .map(ToString::to_string)
        };

        let repo_id = config_str(REPO_ID_KEYS).or_else(|| {
            event
                .updates
                .as_ref()
                .and_then(|u| first_str(u, &[&["repo_id"], &["knowledge_id"]]))
                .map(ToString::to_string)
        });
        let name = config_str(REPO_NAME_KEYS)
            .or_else(|| node.map(|n| n.name.clone()).filter(|n| !n.is_empty()))
            .or_else(|| event.resolved_node_id().map(ToString::to_string))
            .unwrap_or_else(|| crate::nodes::UNKNOWN_NODE.to_string());

        Self {
            name,
            short_id: repo_id.map(|id| truncate_id(&id, input.ctx.options.short_id_len)),
            kind: config_str(REPO_KIND_KEYS),
        }
    }

    /// `name (id, kind)`, leaving out whatever is unknown.
    fn describe(&self) -> String {
        let details: Vec<&str> = [self.short_id.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if details.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, details.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RetrievalCounts {
    docs: usize,
    chunks: usize,
}

impl RetrievalCounts {
    fn from_event(event: &TraceEvent) -> Self {
        let sources = payload_sources(event);
        let count = |paths: &[&[&str]]| {
            sources
                .iter()
                .find_map(|payload| first_array_len(payload, paths))
                .unwrap_or(0)
        };
        Self {
            docs: count(DOC_PATHS),
            chunks: count(CHUNK_PATHS),
        }
    }

    fn is_empty(&self) -> bool {
        self.docs == 0 && self.chunks == 0
    }

    /// Documents when reported, otherwise chunks.
    fn retrieved(&self) -> usize {
        if self.docs > 0 {
            self.docs
        } else {
            self.chunks
        }
    }
}
