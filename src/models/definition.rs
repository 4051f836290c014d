//! Parsed Definition Models
//!
//! Transient facts produced by the source parser for one file. Definitions
//! live for a single reconciliation pass and are never persisted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::node::SourceRange;

/// The kind of a parsed symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Class,
    Method,
}

/// One parsed symbol from one source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    /// Symbol kind
    pub kind: DefinitionKind,
    /// Class or method name
    pub name: String,
    /// Qualified namespace of the class, when declared
    pub namespace: Option<String>,
    /// Range of the symbol in its file
    pub range: SourceRange,
    /// The file the symbol was parsed from
    pub file: PathBuf,
    /// Capability tags (PHPUnit group annotations and the like)
    pub tags: Vec<String>,
}

impl Definition {
    /// Create a class definition
    pub fn class(name: impl Into<String>, file: impl Into<PathBuf>, range: SourceRange) -> Self {
        Self {
            kind: DefinitionKind::Class,
            name: name.into(),
            namespace: None,
            range,
            file: file.into(),
            tags: Vec::new(),
        }
    }

    /// Create a method definition
    pub fn method(name: impl Into<String>, file: impl Into<PathBuf>, range: SourceRange) -> Self {
        Self {
            kind: DefinitionKind::Method,
            name: name.into(),
            namespace: None,
            range,
            file: file.into(),
            tags: Vec::new(),
        }
    }

    /// Set the qualified namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set capability tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}
