//! Lookup of graph node metadata by identifier or display name.
//!
//! Trace producers disagree on whether they stamp events with the node's id
//! or its display name, so every lookup tries both.

use trace_types::{NodeDescriptor, TraceEvent};

pub const UNKNOWN_NODE: &str = "unknown";

#[derive(Debug, Clone, Copy)]
pub struct NodeDirectory<'a> {
    nodes: &'a [NodeDescriptor],
}

impl<'a> NodeDirectory<'a> {
    pub fn new(nodes: &'a [NodeDescriptor]) -> Self {
        Self { nodes }
    }

    /// Find a node by id, falling back to display name.
    pub fn lookup(&self, key: &str) -> Option<&'a NodeDescriptor> {
        if key.is_empty() {
            return None;
        }
        self.nodes
            .iter()
            .find(|node| node.id == key)
            .or_else(|| self.nodes.iter().find(|node| node.name == key))
    }

    /// Descriptor of the node that produced `event`.
    pub fn for_event(&self, event: &TraceEvent) -> Option<&'a NodeDescriptor> {
        event
            .node_id
            .as_deref()
            .and_then(|id| self.lookup(id))
            .or_else(|| event.node_name.as_deref().and_then(|name| self.lookup(name)))
    }

    /// Human label for the node that produced `event`.
    pub fn display_name(&self, event: &TraceEvent) -> String {
        self.for_event(event)
            .map(|node| node.name.as_str())
            .filter(|name| !name.is_empty())
            .or_else(|| event.resolved_node_id())
            .unwrap_or(UNKNOWN_NODE)
            .to_string()
    }

    /// Whether `event` was produced by the node selected as `target`.
    ///
    /// Matches on either identity field, and on the target descriptor's other
    /// identity when the event only carries one of them.
    pub fn event_matches(&self, event: &TraceEvent, target: &str) -> bool {
        let identities = self.identities(target);
        [event.node_id.as_deref(), event.node_name.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| identities.iter().any(|id| *id == field))
    }

    /// Every string a producer may have used to name `target`.
    pub fn identities<'t>(&self, target: &'t str) -> Vec<&'t str>
    where
        'a: 't,
    {
        let mut identities = vec![target];
        if let Some(node) = self.lookup(target) {
            identities.push(node.id.as_str());
            identities.push(node.name.as_str());
        }
        identities.retain(|id| !id.is_empty());
        identities.dedup();
        identities
    }
}
