//! Suite Mapper
//!
//! Alternative placement strategy: a class is rooted under the first
//! configured suite whose include patterns match its file. A file no suite
//! matches is excluded from the catalog entirely.

use std::path::Path;

use glob::Pattern;
use tracing::warn;

use crate::models::{Node, NodeId, NodeKind, SuiteDefinition};
use crate::services::catalog::CatalogTree;
use crate::utils::error::AppResult;
use crate::utils::paths::{normalized, relative_to};

/// One suite with its compiled include patterns
#[derive(Debug)]
struct CompiledSuite {
    definition: SuiteDefinition,
    patterns: Vec<Pattern>,
}

/// Maps files to configured suites by glob/path match
#[derive(Debug, Default)]
pub struct SuiteMapper {
    suites: Vec<CompiledSuite>,
}

impl SuiteMapper {
    pub fn new(definitions: Vec<SuiteDefinition>) -> Self {
        let mut mapper = Self::default();
        mapper.set_suites(definitions);
        mapper
    }

    /// Replace the suite configuration. Unparseable patterns are dropped
    /// with a warning; the suite keeps its remaining patterns.
    pub fn set_suites(&mut self, definitions: Vec<SuiteDefinition>) {
        self.suites = definitions
            .into_iter()
            .map(|definition| {
                let patterns = definition
                    .include
                    .iter()
                    .filter_map(|raw| match Pattern::new(raw) {
                        Ok(pattern) => Some(pattern),
                        Err(e) => {
                            warn!(suite = %definition.name, pattern = %raw, error = %e,
                                "invalid suite include pattern, dropping");
                            None
                        }
                    })
                    .collect();
                CompiledSuite {
                    definition,
                    patterns,
                }
            })
            .collect();
    }

    pub fn suites(&self) -> impl Iterator<Item = &SuiteDefinition> {
        self.suites.iter().map(|s| &s.definition)
    }

    /// The first suite whose include patterns match the file, or None when
    /// the file belongs to no suite and must be excluded from the catalog.
    pub fn resolve_suite(&self, file: &Path) -> Option<&SuiteDefinition> {
        self.suites
            .iter()
            .find(|suite| {
                let relative = suite
                    .definition
                    .config_path
                    .parent()
                    .and_then(|dir| relative_to(file, dir))
                    .map(|p| normalized(&p));
                let absolute = normalized(file);
                suite.patterns.iter().any(|pattern| {
                    relative
                        .as_deref()
                        .map(|r| pattern.matches(r))
                        .unwrap_or(false)
                        || pattern.matches(&absolute)
                })
            })
            .map(|s| &s.definition)
    }

    /// Create or reuse the root node for a suite. Suite roots are keyed by
    /// (config location, name) and survive configuration reloads.
    pub fn ensure_root(&self, tree: &mut CatalogTree, suite: &SuiteDefinition) -> AppResult<NodeId> {
        let id = NodeId::suite(&suite.config_path, &suite.name);
        if !tree.contains(&id) {
            let node = Node::new(id.clone(), NodeKind::Suite, &suite.name, &suite.config_path);
            tree.insert(node)?;
        }
        Ok(id)
    }
}
