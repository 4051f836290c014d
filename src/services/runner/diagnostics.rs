//! Diagnostics Projector
//!
//! Turns failed outcomes with resolved source locations into per-file
//! annotations. Annotation sets are replaced per file atomically at the end
//! of a run and cleared wholesale at the start of the next one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::models::RunSummary;

/// One file annotation, spanning from the first non-whitespace column to
/// line end (0-based columns, 1-based line as reported by the tool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub line: u32,
    pub column_start: u32,
    pub column_end: u32,
    pub message: String,
}

/// Projects run failures into per-file annotation groups
#[derive(Debug, Default)]
pub struct DiagnosticsProjector {
    annotations: HashMap<PathBuf, Vec<Annotation>>,
}

impl DiagnosticsProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the full annotation set at the start of a run. Returns the
    /// files whose annotations were dropped so the host can wipe them.
    pub fn begin_run(&mut self) -> Vec<PathBuf> {
        self.annotations.drain().map(|(file, _)| file).collect()
    }

    /// Current annotation groups, per file
    pub fn annotations(&self) -> &HashMap<PathBuf, Vec<Annotation>> {
        &self.annotations
    }

    /// Rebuild the annotation set from a finished run. Every failed result
    /// carrying both a message and a resolved location yields one
    /// annotation; groups are replaced per file, not merged.
    pub fn project(&mut self, summary: &RunSummary) -> &HashMap<PathBuf, Vec<Annotation>> {
        let mut fresh: HashMap<PathBuf, Vec<Annotation>> = HashMap::new();

        for result in summary.results.values().flatten() {
            if !result.status.is_failure() {
                continue;
            }
            let (Some(message), Some(location)) = (&result.message, &result.location) else {
                continue;
            };

            let (column_start, column_end) = line_span(&location.file, location.line);
            fresh.entry(location.file.clone()).or_default().push(Annotation {
                line: location.line,
                column_start,
                column_end,
                message: message.clone(),
            });
        }

        for group in fresh.values_mut() {
            group.sort_by_key(|a| (a.line, a.column_start));
        }

        self.annotations = fresh;
        &self.annotations
    }
}

/// Span from the first non-whitespace column to line end. An unreadable
/// file or out-of-range line degrades to a zero-width span at column 0.
fn line_span(file: &Path, line: u32) -> (u32, u32) {
    let Ok(content) = fs::read_to_string(file) else {
        return (0, 0);
    };
    let Some(text) = content.lines().nth(line.saturating_sub(1) as usize) else {
        return (0, 0);
    };

    let start = text.chars().take_while(|c| c.is_whitespace()).count() as u32;
    let end = text.trim_end().chars().count() as u32;
    (start, end.max(start))
}
