//! Node arena
//!
//! Nodes live in a slot map keyed by [`NodeId`]; every graph has a root
//! group node that cannot be removed.

use slotmap::SlotMap;

use super::node::{Node, NodeId, NodeKind};
use super::SceneError;

/// Tree of nodes rooted at a group node
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a graph containing only the root
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Group, None));
        Self { nodes, root }
    }

    /// The root node
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Borrow a node or fail with [`SceneError::NodeNotFound`]
    ///
    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn try_node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Number of nodes including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Child nodes of `id`, empty if the node does not exist
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or_default()
    }

    /// Parent of `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    /// Append a node as the last child of `parent`
    ///
    /// # Errors
    ///
    /// Fails if `parent` is not a live node.
    pub fn add_node(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = self.nodes.insert(Node::new(kind, Some(parent)));
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Remove `id` and its whole subtree
    ///
    /// Returns the removed nodes, parents before children.
    ///
    /// # Errors
    ///
    /// Fails for the root and for ids that are not live.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<(NodeId, Node)>, SceneError> {
        if id == self.root {
            return Err(SceneError::RemoveRoot);
        }
        let parent = self.try_node(id)?.parent;
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.children.retain(|child| *child != id);
        }

        let mut removed = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next) {
                pending.extend(node.children.iter().rev().copied());
                removed.push((next, node));
            }
        }
        Ok(removed)
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
