//! The rendering surface meta-data markers are written into.
//!
//! Rendered output belongs to an external UI layer. The core only needs to
//! place invisible sentinel markers next to two nodes of that output and to
//! remove them again, which is what `MarkerHost` captures.

use std::collections::HashMap;

/// Opaque handle of a node owned by a `MarkerHost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

pub trait MarkerHost {
    /// Whether `node` sits inside a document/container.
    fn is_attached(&self, node: NodeId) -> bool;

    /// Insert a marker carrying `payload` right before `anchor`.
    fn insert_before(&mut self, anchor: NodeId, payload: &str) -> Option<NodeId>;

    /// Insert a marker carrying `payload` right after `anchor`.
    fn insert_after(&mut self, anchor: NodeId, payload: &str) -> Option<NodeId>;

    /// Remove `node`. Removing an unknown node is a no-op.
    fn remove(&mut self, node: NodeId);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNode {
    Element(String),
    Marker(String),
}

/// A flat, in-memory sibling list implementing `MarkerHost`.
///
/// Used by tests and by tooling that wants to see where markers land without
/// a real rendering surface.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    next_id: u64,
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, MemoryNode>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attached element.
    pub fn append(&mut self, tag: impl Into<String>) -> NodeId {
        let id = self.create(tag);
        self.order.push(id);
        id
    }

    /// Create a detached element.
    pub fn create(&mut self, tag: impl Into<String>) -> NodeId {
        self.allocate(MemoryNode::Element(tag.into()))
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    /// Payloads of the attached markers, in document order.
    pub fn markers(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|id| match self.nodes.get(id) {
                Some(MemoryNode::Marker(payload)) => Some(payload.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Attached nodes rendered as `<tag>` / `<!--payload-->`, in document order.
    pub fn snapshot(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|node| match node {
                MemoryNode::Element(tag) => format!("<{tag}>"),
                MemoryNode::Marker(payload) => format!("<!--{payload}-->"),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn allocate(&mut self, node: MemoryNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        self.order.iter().position(|id| *id == node)
    }
}

impl MarkerHost for MemoryDocument {
    fn is_attached(&self, node: NodeId) -> bool {
        self.position(node).is_some()
    }

    fn insert_before(&mut self, anchor: NodeId, payload: &str) -> Option<NodeId> {
        let index = self.position(anchor)?;
        let marker = self.allocate(MemoryNode::Marker(payload.to_string()));
        self.order.insert(index, marker);
        Some(marker)
    }

    fn insert_after(&mut self, anchor: NodeId, payload: &str) -> Option<NodeId> {
        let index = self.position(anchor)?;
        let marker = self.allocate(MemoryNode::Marker(payload.to_string()));
        self.order.insert(index + 1, marker);
        Some(marker)
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(index) = self.position(node) {
            self.order.remove(index);
        }
        self.nodes.remove(&node);
    }
}
