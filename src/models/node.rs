//! Catalog Node Models
//!
//! Node identity and structure for the test catalog tree. Identifiers are
//! deterministic functions of (kind, location, name) so that a host UI can
//! key external state (selection, expansion, decorations) on them and have
//! that state survive incidental reparses.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::paths::normalized;

/// The kind of a catalog node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Configuration-declared suite root
    Suite,
    /// Namespace segment (one directory level)
    Namespace,
    /// Test class
    Class,
    /// Test method
    Method,
}

/// Stable, deterministic node identifier
///
/// Suite IDs combine config location and suite name; namespace IDs use the
/// cumulative directory location; class IDs use the file location; method
/// IDs use file location plus method name, with an optional data-set
/// discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Identifier for a suite root node
    pub fn suite(config_path: &Path, name: &str) -> Self {
        Self(format!("suite:{}#{}", normalized(config_path), name))
    }

    /// Identifier for a namespace node, keyed by its cumulative directory
    pub fn namespace(directory: &Path) -> Self {
        Self(format!("namespace:{}", normalized(directory)))
    }

    /// Identifier for a class node, keyed by its source file
    pub fn class(file: &Path) -> Self {
        Self(format!("class:{}", normalized(file)))
    }

    /// Identifier for a method node
    pub fn method(file: &Path, name: &str) -> Self {
        Self(format!("method:{}::{}", normalized(file), name))
    }

    /// Identifier for one data-set case of a method
    pub fn method_case(file: &Path, name: &str, data_set: &str) -> Self {
        Self(format!("method:{}::{}[{}]", normalized(file), name, data_set))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source range, 0-based lines and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    /// Create a range covering whole lines
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            start_column: 0,
            end_line,
            end_column: 0,
        }
    }
}

/// A resolved source location (file plus 1-based line)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
}

/// One element of the catalog tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier
    pub id: NodeId,
    /// Node kind
    pub kind: NodeKind,
    /// Display label (suite name, namespace segment, class or method name)
    pub label: String,
    /// Source location: config file for suites, directory for namespaces,
    /// source file for classes and methods
    pub location: PathBuf,
    /// Range within the source file, when known
    pub range: Option<SourceRange>,
    /// Parent node, unset for roots
    pub parent: Option<NodeId>,
    /// Ordered children; IDs are unique within the list
    pub children: Vec<NodeId>,
    /// The test source file this node derives from; unset for suite and
    /// namespace nodes, which derive from configuration
    pub origin: Option<PathBuf>,
    /// Capability tags carried by the definition (e.g. PHPUnit groups)
    pub tags: Vec<String>,
    /// Workspace root the node's file belongs to
    pub workspace_root: Option<PathBuf>,
}

impl Node {
    /// Create a detached node
    pub fn new(id: NodeId, kind: NodeKind, label: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            location: location.into(),
            range: None,
            parent: None,
            children: Vec::new(),
            origin: None,
            tags: Vec::new(),
            workspace_root: None,
        }
    }

    /// Set the source range
    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Set the originating test source file
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Whether this node can resolve children (anything but a method)
    pub fn resolvable_children(&self) -> bool {
        self.kind != NodeKind::Method
    }
}
