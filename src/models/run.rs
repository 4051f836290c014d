//! Run Models
//!
//! Per-run outcome types: statuses, results, tallies and the run summary
//! handed back to the host UI.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::node::{NodeId, SourceLocation};

/// Outcome status of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Unknown,
    Started,
    Skipped,
    Ignored,
    Incomplete,
    Passed,
    Risky,
    Warning,
    Failed,
    Error,
}

impl TestStatus {
    /// Whether the status represents a failure the diagnostics projector
    /// should annotate
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Error)
    }
}

/// One outcome captured for one node during one run
///
/// A node may accumulate several results within a run when the test repeats
/// over a data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub node_id: NodeId,
    pub status: TestStatus,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub location: Option<SourceLocation>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub data_set: Option<String>,
    pub duration_ms: u64,
}

impl RunResult {
    /// Create a fresh result in the started state
    pub fn started(node_id: NodeId) -> Self {
        Self {
            node_id,
            status: TestStatus::Started,
            message: None,
            detail: None,
            location: None,
            expected: None,
            actual: None,
            data_set: None,
            duration_ms: 0,
        }
    }
}

/// Test/failure counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub tests: u32,
    pub assertions: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
}

/// Summary of one run
///
/// `reported` holds the totals the external tool claimed in its own summary
/// output; `actual` holds totals counted from individual result events. The
/// two are never reconciled automatically; a mismatch is informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub reported: Tally,
    pub actual: Tally,
    /// Ordered result history per node for this run
    pub results: HashMap<NodeId, Vec<RunResult>>,
    /// Unattributed fatal-error blocks (stderr content, spawn failures)
    pub fatal: Vec<String>,
    /// Raw coverage artifact contents, one per execution unit in dispatch
    /// order, when coverage was requested
    pub coverage: Vec<String>,
    /// User-facing note, e.g. "no test summary available"
    pub message: Option<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            reported: Tally::default(),
            actual: Tally::default(),
            results: HashMap::new(),
            fatal: Vec::new(),
            coverage: Vec::new(),
            message: None,
        }
    }

    /// Append a result to a node's ordered history
    pub fn push_result(&mut self, result: RunResult) {
        self.results
            .entry(result.node_id.clone())
            .or_default()
            .push(result);
    }

    /// Results recorded for one node, in arrival order
    pub fn results_for(&self, node_id: &NodeId) -> &[RunResult] {
        self.results.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// What a run request covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunSelection {
    /// Every method leaf in the catalog
    All,
    /// One node and its whole subtree
    Node(NodeId),
}

/// A request to run a selection of tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub selection: RunSelection,
    /// Only leaves carrying this capability tag qualify, when set
    pub tag: Option<String>,
    /// Debug-launch marker, carried through unchanged. The planned command
    /// line is identical either way; the host owns debugger wiring (e.g.
    /// starting the process under its own debug adapter).
    pub debug: bool,
    pub coverage: bool,
}

impl RunRequest {
    pub fn all() -> Self {
        Self {
            selection: RunSelection::All,
            tag: None,
            debug: false,
            coverage: false,
        }
    }

    pub fn node(id: NodeId) -> Self {
        Self {
            selection: RunSelection::Node(id),
            tag: None,
            debug: false,
            coverage: false,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_coverage(mut self) -> Self {
        self.coverage = true;
        self
    }
}

/// Outcome of a run entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The run dispatched; partial summaries count as completed
    Completed(RunSummary),
    /// Nothing could be dispatched; carries a user-facing message
    NothingToRun(String),
}
