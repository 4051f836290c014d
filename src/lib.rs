//! PHPUnit catalog and run-correlation engine.
//!
//! Keeps a live tree of test suites, namespaces, classes and methods in sync
//! with the source files and configuration of one or more workspace roots,
//! dispatches PHPUnit invocations for arbitrary selections of that tree, and
//! correlates the tool's TeamCity-format output stream back onto catalog
//! nodes as structured results and failure diagnostics.

pub mod models;
pub mod services;
pub mod utils;

pub use models::{
    Definition, DefinitionKind, NamespaceMapping, Node, NodeId, NodeKind, RegexMapPair,
    RunOutcome, RunRequest, RunResult, RunSelection, RunSummary, RunnerSettings, SourceLocation,
    SourceRange, SuiteDefinition, Tally, TestStatus,
};
pub use services::catalog::{CatalogService, CatalogTree, Reconciler, TreeEvent};
pub use services::parsing::{AutoloadParser, SourceParser, SuiteConfigParser};
pub use services::placement::{NamespaceResolver, PlacementStrategy, SuiteMapper};
pub use services::runner::{
    ContinuousRunMatcher, DiagnosticsProjector, RunDispatcher, TeamCityParser, WatchPattern,
};
pub use services::sync::{ChangeKind, FileChangeEvent, WatchedFileKind, WorkspaceWatcher};
pub use utils::error::{AppError, AppResult};
