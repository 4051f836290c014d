//! Workspace Change Events
//!
//! Classifies raw file-system changes into the categories the catalog
//! reacts to: autoload configuration, runner configuration, and test
//! source files. Anything else is ignored at the watch layer.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::utils::paths::is_php_file;

/// What happened to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Which catalog concern a watched file feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedFileKind {
    /// composer.json: namespace prefix/directory mappings
    AutoloadConfig,
    /// phpunit.xml / phpunit.xml.dist / phpunit.dist.xml: suite definitions
    RunnerConfig,
    /// A PHP source file that may define tests
    TestSource,
}

/// A classified file-system change within a workspace root
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub file_kind: WatchedFileKind,
    pub workspace_root: PathBuf,
}

impl FileChangeEvent {
    pub fn new(
        path: PathBuf,
        kind: ChangeKind,
        file_kind: WatchedFileKind,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            path,
            kind,
            file_kind,
            workspace_root,
        }
    }
}

/// Classify a changed path, or `None` when the catalog does not care
pub fn classify(path: &Path) -> Option<WatchedFileKind> {
    let name = path.file_name()?.to_str()?;
    match name {
        "composer.json" => Some(WatchedFileKind::AutoloadConfig),
        "phpunit.xml" | "phpunit.xml.dist" | "phpunit.dist.xml" => {
            Some(WatchedFileKind::RunnerConfig)
        }
        _ if is_php_file(path) => Some(WatchedFileKind::TestSource),
        _ => None,
    }
}
