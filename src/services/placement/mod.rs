//! Placement Strategies
//!
//! "Suite" and "namespace" placement are mutually exclusive strategies
//! selected by configuration; the reconciler consumes one strategy value
//! rather than duplicating its logic per mode.

pub mod namespace;
pub mod suite;

use std::path::PathBuf;

pub use namespace::NamespaceResolver;
pub use suite::SuiteMapper;

use crate::models::{Definition, NodeId};
use crate::services::catalog::CatalogTree;
use crate::utils::error::AppResult;

/// Where a class node goes: its immediate parent plus the workspace root its
/// file belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPlacement {
    pub parent: NodeId,
    pub workspace_root: PathBuf,
}

/// The placement strategy the reconciler roots class nodes with
#[derive(Debug)]
pub enum PlacementStrategy {
    /// Organize by autoload namespace mappings
    Namespace(NamespaceResolver),
    /// Organize by configured suites; unmatched files are excluded
    Suite(SuiteMapper),
}

impl PlacementStrategy {
    /// Resolve (creating or reusing intermediate nodes) the parent for a
    /// class definition. `None` means the file is excluded from the catalog.
    pub fn class_parent(
        &self,
        tree: &mut CatalogTree,
        definition: &Definition,
    ) -> AppResult<Option<ClassPlacement>> {
        match self {
            PlacementStrategy::Namespace(resolver) => {
                resolver.resolve_parent(tree, definition).map(Some)
            }
            PlacementStrategy::Suite(mapper) => {
                let Some(suite) = mapper.resolve_suite(&definition.file) else {
                    return Ok(None);
                };
                let workspace_root = suite
                    .config_path
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_default();
                let suite = suite.clone();
                let parent = mapper.ensure_root(tree, &suite)?;
                Ok(Some(ClassPlacement {
                    parent,
                    workspace_root,
                }))
            }
        }
    }
}
