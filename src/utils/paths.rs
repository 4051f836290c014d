//! Path Helpers
//!
//! Small path utilities shared by placement and matching code.

use std::path::{Path, PathBuf};

/// Check whether `ancestor` is an ancestor directory of `path` (or equal to it).
pub fn is_ancestor(ancestor: &Path, path: &Path) -> bool {
    path.starts_with(ancestor)
}

/// Check whether a path looks like a PHP source file.
pub fn is_php_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("php"))
        .unwrap_or(false)
}

/// The file stem of a path, as an owned string.
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Render a path with forward slashes, for use in stable identifiers and
/// pattern matching regardless of platform.
pub fn normalized(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Relativize `path` against `base`, when possible.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}
