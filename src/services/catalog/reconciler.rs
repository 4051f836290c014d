//! Catalog Reconciler
//!
//! Merges a fresh parse of one file into the catalog tree. Reconciliation is
//! scoped to the definitions handed in: nodes from the same file that no
//! longer appear are pruned, everything else in the tree is untouched.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::models::{Definition, DefinitionKind, Node, NodeId, NodeKind};
use crate::services::placement::PlacementStrategy;
use crate::utils::error::AppResult;

use super::tree::CatalogTree;

/// Applies per-file definition lists to the catalog tree
#[derive(Debug, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile `file` against `definitions` (in source order).
    ///
    /// Existing nodes keep their identity across edits: matching nodes are
    /// updated (and reparented when their namespace or suite placement
    /// moved), new ones are inserted, and nodes from this file absent from
    /// the definitions are removed with an upward cascade that stops at
    /// roots and at nodes revisited during this pass.
    pub fn reconcile(
        &self,
        tree: &mut CatalogTree,
        file: &Path,
        definitions: &[Definition],
        placement: &PlacementStrategy,
    ) -> AppResult<()> {
        let orphans = tree.ids_from_file(file);
        let mut revisited: HashSet<NodeId> = HashSet::new();
        let mut current_class: Option<NodeId> = None;

        for definition in definitions {
            match definition.kind {
                DefinitionKind::Class => {
                    let Some(spot) = placement.class_parent(tree, definition)? else {
                        // Not part of any configured suite: keep it out of
                        // the tree and drop its methods with it.
                        current_class = None;
                        continue;
                    };
                    let id = NodeId::class(file);
                    self.upsert(
                        tree,
                        &id,
                        NodeKind::Class,
                        definition,
                        file,
                        Some(spot.parent.clone()),
                        &revisited,
                    )?;
                    tree.set_workspace_root(&id, &spot.workspace_root);
                    revisited.insert(id.clone());
                    revisited.insert(spot.parent);
                    current_class = Some(id);
                }
                DefinitionKind::Method => {
                    let Some(class_id) = current_class.clone() else {
                        debug!(file = %file.display(), method = %definition.name,
                            "method definition without a placed class, skipping");
                        continue;
                    };
                    let id = NodeId::method(file, &definition.name);
                    self.upsert(
                        tree,
                        &id,
                        NodeKind::Method,
                        definition,
                        file,
                        Some(class_id.clone()),
                        &revisited,
                    )?;
                    if let Some(root) = tree.get(&class_id).and_then(|n| n.workspace_root.clone()) {
                        tree.set_workspace_root(&id, &root);
                    }
                    revisited.insert(id);
                }
            }
        }

        // Sweep: anything this file produced before but not this time.
        for orphan in orphans {
            if revisited.contains(&orphan) {
                continue;
            }
            if tree.contains(&orphan) {
                tree.remove_cascading(&orphan, &revisited);
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert(
        &self,
        tree: &mut CatalogTree,
        id: &NodeId,
        kind: NodeKind,
        definition: &Definition,
        file: &Path,
        parent: Option<NodeId>,
        revisited: &HashSet<NodeId>,
    ) -> AppResult<()> {
        if tree.contains(id) {
            if let Some(new_parent) = &parent {
                let old_parent = tree.parent_of(id).cloned();
                if old_parent.as_ref() != Some(new_parent) {
                    tree.reparent(id, new_parent)?;
                    // The move may leave namespace segments behind with
                    // nothing under them.
                    if let Some(old_parent) = old_parent {
                        tree.prune_childless(&old_parent, revisited);
                    }
                }
            }
            tree.update(id, &definition.name, Some(definition.range), &definition.tags);
            return Ok(());
        }

        let mut node = Node::new(id.clone(), kind, &definition.name, file)
            .with_origin(file)
            .with_range(definition.range);
        node.tags = definition.tags.clone();
        node.parent = parent;
        tree.insert(node)
    }
}
