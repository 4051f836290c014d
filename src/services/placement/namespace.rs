//! Namespace Resolver
//!
//! Maps a class's logical namespace to a directory path using the autoload
//! prefix/directory mapping entries, verifying that every cumulative
//! directory exists on disk. Verification failures degrade to flat placement
//! under the nearest root with a warning; they never abort reconciliation.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::models::{Definition, NamespaceMapping, Node, NodeId, NodeKind};
use crate::services::catalog::CatalogTree;
use crate::services::placement::ClassPlacement;
use crate::utils::error::AppResult;
use crate::utils::paths::is_ancestor;

/// Resolves class parents from autoload namespace mappings
#[derive(Debug, Default)]
pub struct NamespaceResolver {
    mappings: Vec<NamespaceMapping>,
    workspace_roots: Vec<PathBuf>,
}

impl NamespaceResolver {
    pub fn new(workspace_roots: Vec<PathBuf>) -> Self {
        Self {
            mappings: Vec::new(),
            workspace_roots,
        }
    }

    /// Replace the mapping entries after a configuration reload. Root nodes
    /// already in the tree are keyed by directory and get reused as-is.
    pub fn set_mappings(&mut self, mappings: Vec<NamespaceMapping>) {
        self.mappings = mappings;
    }

    pub fn mappings(&self) -> &[NamespaceMapping] {
        &self.mappings
    }

    /// Resolve (and create or reuse) the parent node chain for a class
    /// definition. Returns the immediate parent plus the workspace root the
    /// class belongs to.
    pub fn resolve_parent(
        &self,
        tree: &mut CatalogTree,
        definition: &Definition,
    ) -> AppResult<ClassPlacement> {
        let file = definition.file.as_path();
        let namespace = definition
            .namespace
            .as_deref()
            .unwrap_or("")
            .trim_matches('\\');

        let mapping = self
            .mappings
            .iter()
            .filter(|m| prefix_matches(&m.prefix, namespace) && is_ancestor(&m.directory, file))
            .max_by_key(|m| m.prefix.len());

        let Some(mapping) = mapping else {
            let root = self.workspace_root_for(file);
            let root_id = self.ensure_root(tree, &root)?;
            return Ok(ClassPlacement {
                parent: root_id,
                workspace_root: root,
            });
        };

        if !mapping.directory.is_dir() {
            warn!(
                prefix = %mapping.prefix,
                directory = %mapping.directory.display(),
                "autoload mapping directory missing, placing class flatly"
            );
            let root = self.workspace_root_for(file);
            let root_id = self.ensure_root(tree, &root)?;
            return Ok(ClassPlacement {
                parent: root_id,
                workspace_root: root,
            });
        }

        // The prefix itself is one segment, keyed by the mapping directory.
        let prefix_label = mapping.prefix.trim_end_matches('\\');
        let prefix_id = self.ensure_segment(tree, &mapping.directory, prefix_label, None)?;

        let mut parent = prefix_id.clone();
        let mut cumulative = mapping.directory.clone();
        let stripped = mapping.prefix.trim_end_matches('\\');
        let remainder = namespace[stripped.len().min(namespace.len())..].trim_matches('\\');

        if !remainder.is_empty() {
            for segment in remainder.split('\\') {
                cumulative.push(segment);
                if !cumulative.is_dir() {
                    warn!(
                        namespace = %namespace,
                        directory = %cumulative.display(),
                        "namespace directory missing, placing class flatly"
                    );
                    return Ok(ClassPlacement {
                        parent: prefix_id,
                        workspace_root: mapping.workspace_root.clone(),
                    });
                }
                parent = self.ensure_segment(tree, &cumulative, segment, Some(parent))?;
            }
        }

        Ok(ClassPlacement {
            parent,
            workspace_root: mapping.workspace_root.clone(),
        })
    }

    /// The workspace root a file belongs to: the longest configured root
    /// that is an ancestor of the file, falling back to its directory.
    fn workspace_root_for(&self, file: &Path) -> PathBuf {
        self.workspace_roots
            .iter()
            .filter(|r| is_ancestor(r, file))
            .max_by_key(|r| r.as_os_str().len())
            .cloned()
            .unwrap_or_else(|| file.parent().map(Path::to_path_buf).unwrap_or_default())
    }

    /// Create or reuse the per-workspace catch-all root node
    fn ensure_root(&self, tree: &mut CatalogTree, root: &Path) -> AppResult<NodeId> {
        let label = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        self.ensure_segment(tree, root, &label, None)
    }

    /// Create or reuse one namespace node keyed by its cumulative directory
    fn ensure_segment(
        &self,
        tree: &mut CatalogTree,
        directory: &Path,
        label: &str,
        parent: Option<NodeId>,
    ) -> AppResult<NodeId> {
        let id = NodeId::namespace(directory);
        if !tree.contains(&id) {
            let mut node = Node::new(id.clone(), NodeKind::Namespace, label, directory);
            node.parent = parent;
            tree.insert(node)?;
        }
        Ok(id)
    }
}

/// Composer prefixes carry a trailing backslash; a prefix matches when the
/// namespace equals it or descends from it.
fn prefix_matches(prefix: &str, namespace: &str) -> bool {
    let stripped = prefix.trim_end_matches('\\');
    namespace == stripped
        || namespace
            .strip_prefix(stripped)
            .map(|rest| rest.starts_with('\\'))
            .unwrap_or(false)
}
