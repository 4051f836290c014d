//! Configuration Models
//!
//! Read-only inputs produced by the autoload and test-runner config parsers,
//! plus runner settings supplied by the host's settings storage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One autoload prefix-to-directory mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMapping {
    /// Namespace prefix, e.g. `App\Tests\`
    pub prefix: String,
    /// Directory the prefix maps to
    pub directory: PathBuf,
    /// Workspace root the mapping belongs to
    pub workspace_root: PathBuf,
}

impl NamespaceMapping {
    pub fn new(
        prefix: impl Into<String>,
        directory: impl Into<PathBuf>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            directory: directory.into(),
            workspace_root: workspace_root.into(),
        }
    }
}

/// One configuration-declared suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDefinition {
    /// Suite name as declared in the runner configuration
    pub name: String,
    /// The configuration file the suite was declared in
    pub config_path: PathBuf,
    /// Include glob patterns, relative to the configuration file's directory
    pub include: Vec<String>,
}

impl SuiteDefinition {
    pub fn new(name: impl Into<String>, config_path: impl Into<PathBuf>, include: Vec<String>) -> Self {
        Self {
            name: name.into(),
            config_path: config_path.into(),
            include,
        }
    }
}

/// A configured source-pattern/test-pattern regex pair for mapping a changed
/// source file to the test file that covers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexMapPair {
    /// Regex matched against the changed file's path
    pub source_pattern: String,
    /// Replacement template producing the test file path
    pub test_pattern: String,
}

/// Settings for invoking the external test-running process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// The PHP interpreter command
    pub php_command: String,
    /// Path to the PHPUnit entry point, relative to a workspace root
    pub phpunit_path: String,
    /// Extra arguments appended to every invocation
    pub extra_args: Vec<String>,
    /// Workspace roots the catalog spans
    pub workspace_roots: Vec<PathBuf>,
    /// Source/test regex pairs for continuous-run matching
    pub map_pairs: Vec<RegexMapPair>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            php_command: "php".to_string(),
            phpunit_path: "vendor/bin/phpunit".to_string(),
            extra_args: Vec::new(),
            workspace_roots: Vec::new(),
            map_pairs: Vec::new(),
        }
    }
}
