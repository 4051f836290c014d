//! Catalog Tree
//!
//! The authoritative node store. Nodes live in an arena indexed by ID; each
//! node holds a parent ID option and an ordered child-ID list, so moving a
//! node between parents is a detach+attach within the arena rather than
//! pointer rewiring.
//!
//! Mutations emit change notifications over an optional channel so a host UI
//! can mirror the tree incrementally.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::{Node, NodeId, NodeKind, SourceRange};
use crate::utils::error::{AppError, AppResult};

/// Change notification for the host UI layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TreeEvent {
    Added {
        id: NodeId,
        kind: NodeKind,
        label: String,
        range: Option<SourceRange>,
        resolvable_children: bool,
    },
    Updated {
        id: NodeId,
        kind: NodeKind,
        label: String,
        range: Option<SourceRange>,
        resolvable_children: bool,
    },
    Removed {
        id: NodeId,
    },
}

/// The catalog tree: a forest of suite/namespace/class/method nodes
#[derive(Debug, Default)]
pub struct CatalogTree {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    events: Option<mpsc::UnboundedSender<TreeEvent>>,
}

impl CatalogTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to change notifications. Only one subscriber is supported;
    /// a later call replaces the earlier channel.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TreeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    fn emit(&self, event: TreeEvent) {
        if let Some(tx) = &self.events {
            // Host may have dropped the receiver; that is not our problem.
            let _ = tx.send(event);
        }
    }

    fn emit_added(&self, node: &Node) {
        self.emit(TreeEvent::Added {
            id: node.id.clone(),
            kind: node.kind,
            label: node.label.clone(),
            range: node.range,
            resolvable_children: node.resolvable_children(),
        });
    }

    fn emit_updated(&self, node: &Node) {
        self.emit(TreeEvent::Updated {
            id: node.id.clone(),
            kind: node.kind,
            label: node.label.clone(),
            range: node.range,
            resolvable_children: node.resolvable_children(),
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Root node IDs in insertion order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Parent of a node, if attached under one
    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.get(id).and_then(|n| n.parent.as_ref())
    }

    /// Children of a node in order
    pub fn children_of(&self, id: &NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Insert a detached node under its `parent` field (or as a root when
    /// unset). The ID must not already be present.
    pub fn insert(&mut self, node: Node) -> AppResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(AppError::internal(format!(
                "duplicate catalog node id: {}",
                node.id
            )));
        }

        if let Some(parent_id) = node.parent.clone() {
            let parent = self.nodes.get_mut(&parent_id).ok_or_else(|| {
                AppError::internal(format!("missing parent node: {}", parent_id))
            })?;
            if !parent.children.contains(&node.id) {
                parent.children.push(node.id.clone());
            }
        } else {
            self.roots.push(node.id.clone());
        }

        self.emit_added(&node);
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Update a node's identity-preserving attributes in place. Emits an
    /// update notification only when something actually changed.
    pub fn update(
        &mut self,
        id: &NodeId,
        label: &str,
        range: Option<SourceRange>,
        tags: &[String],
    ) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };

        let changed = node.label != label || node.range != range || node.tags != tags;
        if changed {
            node.label = label.to_string();
            node.range = range;
            node.tags = tags.to_vec();
            let snapshot = node.clone();
            self.emit_updated(&snapshot);
        }
        changed
    }

    /// Record which workspace root a node's file belongs to. Not part of
    /// the node's UI-visible identity, so no notification is emitted.
    pub fn set_workspace_root(&mut self, id: &NodeId, root: &Path) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.workspace_root = Some(root.to_path_buf());
        }
    }

    /// Move a node under a different parent, preserving its identity and
    /// subtree. No-op when the parent is unchanged.
    pub fn reparent(&mut self, id: &NodeId, new_parent: &NodeId) -> AppResult<()> {
        let current = self
            .nodes
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("node {}", id)))?
            .parent
            .clone();

        if current.as_ref() == Some(new_parent) {
            return Ok(());
        }
        if !self.nodes.contains_key(new_parent) {
            return Err(AppError::not_found(format!("parent node {}", new_parent)));
        }

        // Detach
        match current {
            Some(old_parent) => {
                if let Some(parent) = self.nodes.get_mut(&old_parent) {
                    parent.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        // Attach
        if let Some(parent) = self.nodes.get_mut(new_parent) {
            if !parent.children.contains(id) {
                parent.children.push(id.clone());
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(new_parent.clone());
        }

        Ok(())
    }

    /// IDs of all attached nodes originating from `file`
    pub fn ids_from_file(&self, file: &Path) -> HashSet<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.origin.as_deref() == Some(file))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Remove a node and its whole subtree. Detaches from the parent but
    /// performs no upward cascade. Returns the removed IDs.
    pub fn remove_subtree(&mut self, id: &NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };

        match node.parent.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
                self.emit(TreeEvent::Removed { id: current.clone() });
                removed.push(current);
            }
        }
        removed
    }

    /// Remove a node and cascade upward through ancestors left childless.
    ///
    /// The cascade stops at roots (suite, namespace-prefix and catch-all
    /// nodes, which are reused across configuration reloads) and at any
    /// ancestor listed in `keep`.
    pub fn remove_cascading(&mut self, id: &NodeId, keep: &HashSet<NodeId>) -> Vec<NodeId> {
        let ancestor = self.parent_of(id).cloned();
        let mut removed = self.remove_subtree(id);
        if let Some(ancestor) = ancestor {
            removed.extend(self.prune_childless(&ancestor, keep));
        }
        removed
    }

    /// Prune `id` and then its ancestors for as long as they are left
    /// childless, with the same stopping rules as [`remove_cascading`].
    /// Used after a node moved away from its old parent chain.
    ///
    /// [`remove_cascading`]: Self::remove_cascading
    pub fn prune_childless(&mut self, id: &NodeId, keep: &HashSet<NodeId>) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut cursor = Some(id.clone());

        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(&current) else {
                break;
            };
            if !node.children.is_empty() || node.parent.is_none() || keep.contains(&current) {
                break;
            }
            cursor = node.parent.clone();
            removed.extend(self.remove_subtree(&current));
        }
        removed
    }

    /// Drop roots left without children, typically after a configuration
    /// reload replaced the placement strategy.
    pub fn prune_empty_roots(&mut self) {
        let stale: Vec<NodeId> = self
            .roots
            .iter()
            .filter(|r| {
                self.nodes
                    .get(*r)
                    .map(|n| n.children.is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        for id in stale {
            self.remove_subtree(&id);
        }
    }

    /// Method-leaf IDs in the subtree rooted at `id`, in tree order
    pub fn method_leaves(&self, id: &NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                if node.kind == NodeKind::Method {
                    leaves.push(current);
                } else {
                    // Depth-first, preserving child order
                    for child in node.children.iter().rev() {
                        stack.push(child.clone());
                    }
                }
            }
        }
        leaves
    }

    /// Method-leaf IDs across the whole forest
    pub fn all_method_leaves(&self) -> Vec<NodeId> {
        let roots: Vec<NodeId> = self.roots.clone();
        roots
            .iter()
            .flat_map(|r| self.method_leaves(r))
            .collect()
    }
}
