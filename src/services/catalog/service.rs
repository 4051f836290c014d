//! Catalog Service
//!
//! The orchestration layer: owns the tree, the placement strategy and the
//! run machinery, reacts to classified workspace changes, and exposes the
//! run/rerun/watch operations a host binds to its UI.

use std::path::Path;
use std::sync::Arc;

use ignore::WalkBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{
    Definition, NamespaceMapping, RunOutcome, RunRequest, RunnerSettings, SuiteDefinition,
};
use crate::services::parsing::{AutoloadParser, SourceParser, SuiteConfigParser};
use crate::services::placement::{NamespaceResolver, PlacementStrategy, SuiteMapper};
use crate::services::runner::continuous::{ContinuousRunMatcher, WatchPattern};
use crate::services::runner::diagnostics::DiagnosticsProjector;
use crate::services::runner::dispatcher::RunDispatcher;
use crate::services::sync::{ChangeKind, FileChangeEvent, WatchedFileKind};
use crate::utils::error::AppResult;
use crate::utils::paths::is_php_file;

use super::reconciler::Reconciler;
use super::tree::CatalogTree;

/// Orchestrates catalog synchronization and test runs
pub struct CatalogService {
    tree: CatalogTree,
    reconciler: Reconciler,
    placement: PlacementStrategy,
    mappings: Vec<NamespaceMapping>,
    suites: Vec<SuiteDefinition>,
    source_parser: Arc<dyn SourceParser>,
    autoload_parser: Arc<dyn AutoloadParser>,
    suite_parser: Arc<dyn SuiteConfigParser>,
    dispatcher: RunDispatcher,
    diagnostics: DiagnosticsProjector,
    continuous: ContinuousRunMatcher,
    settings: RunnerSettings,
    scanning: bool,
    last_request: Option<RunRequest>,
}

impl CatalogService {
    pub fn new(
        settings: RunnerSettings,
        source_parser: Arc<dyn SourceParser>,
        autoload_parser: Arc<dyn AutoloadParser>,
        suite_parser: Arc<dyn SuiteConfigParser>,
    ) -> Self {
        let placement = PlacementStrategy::Namespace(NamespaceResolver::new(
            settings.workspace_roots.clone(),
        ));
        let continuous = ContinuousRunMatcher::new(&settings.map_pairs);
        let dispatcher = RunDispatcher::new(settings.clone());
        Self {
            tree: CatalogTree::new(),
            reconciler: Reconciler::new(),
            placement,
            mappings: Vec::new(),
            suites: Vec::new(),
            source_parser,
            autoload_parser,
            suite_parser,
            dispatcher,
            diagnostics: DiagnosticsProjector::new(),
            continuous,
            settings,
            scanning: false,
            last_request: None,
        }
    }

    pub fn tree(&self) -> &CatalogTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut CatalogTree {
        &mut self.tree
    }

    pub fn diagnostics(&self) -> &DiagnosticsProjector {
        &self.diagnostics
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// React to one classified workspace change. Configuration changes
    /// rebuild the placement strategy and rescan; source changes reconcile
    /// the single file and may re-trigger run-on-save subscriptions, whose
    /// outcomes are returned.
    pub async fn handle_change(
        &mut self,
        event: &FileChangeEvent,
    ) -> AppResult<Vec<RunOutcome>> {
        match event.file_kind {
            WatchedFileKind::AutoloadConfig => {
                self.mappings = if event.kind == ChangeKind::Deleted {
                    Vec::new()
                } else {
                    match self.autoload_parser.parse_mappings(&event.path).await {
                        Ok(mappings) => mappings,
                        Err(e) => {
                            warn!(path = %event.path.display(), error = %e,
                                "autoload configuration unreadable, clearing mappings");
                            Vec::new()
                        }
                    }
                };
                self.rebuild_placement();
                self.scan_workspace().await?;
                Ok(Vec::new())
            }
            WatchedFileKind::RunnerConfig => {
                self.suites = if event.kind == ChangeKind::Deleted {
                    Vec::new()
                } else {
                    match self.suite_parser.parse_suites(&event.path).await {
                        Ok(suites) => suites,
                        Err(e) => {
                            warn!(path = %event.path.display(), error = %e,
                                "runner configuration unreadable, clearing suites");
                            Vec::new()
                        }
                    }
                };
                self.rebuild_placement();
                self.scan_workspace().await?;
                Ok(Vec::new())
            }
            WatchedFileKind::TestSource => {
                if event.kind == ChangeKind::Deleted {
                    self.reconciler.reconcile(
                        &mut self.tree,
                        &event.path,
                        &[],
                        &self.placement,
                    )?;
                } else {
                    self.reconcile_file(&event.path).await?;
                }

                let mut outcomes = Vec::new();
                for retrigger in self.continuous.on_file_changed(&event.path) {
                    outcomes.push(self.run(retrigger.request, &retrigger.token).await?);
                }
                Ok(outcomes)
            }
        }
    }

    /// Walk every workspace root and reconcile each PHP source file. A
    /// second scan requested while one is in flight is dropped.
    pub async fn scan_workspace(&mut self) -> AppResult<()> {
        if self.scanning {
            debug!("workspace scan already in flight, dropping request");
            return Ok(());
        }
        self.scanning = true;

        let mut roots = self.settings.workspace_roots.iter();
        let Some(first) = roots.next() else {
            self.scanning = false;
            return Ok(());
        };
        let mut builder = WalkBuilder::new(first);
        for root in roots {
            builder.add(root);
        }

        let files: Vec<_> = builder
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                    (is_file && is_php_file(entry.path())).then(|| entry.into_path())
                }
                Err(e) => {
                    warn!(error = %e, "workspace walk entry skipped");
                    None
                }
            })
            .collect();

        for file in &files {
            if let Err(e) = self.reconcile_file(file).await {
                warn!(file = %file.display(), error = %e, "file reconciliation failed");
            }
        }

        self.tree.prune_empty_roots();
        self.scanning = false;
        info!(files = files.len(), nodes = self.tree.len(), "workspace scan complete");
        Ok(())
    }

    /// Parse and reconcile one file. A parse failure degrades to an empty
    /// definition list, which prunes the file's nodes but keeps the rest of
    /// the catalog intact.
    async fn reconcile_file(&mut self, file: &Path) -> AppResult<()> {
        let definitions: Vec<Definition> = match self.source_parser.parse_file(file).await {
            Ok(definitions) => definitions,
            Err(e) => {
                warn!(file = %file.display(), error = %e,
                    "source parse failed, treating file as empty");
                Vec::new()
            }
        };
        self.reconciler
            .reconcile(&mut self.tree, file, &definitions, &self.placement)
    }

    /// Execute a run for a selection. Diagnostics from the previous run are
    /// cleared up front; the summary is projected into fresh annotations and
    /// the request is retained for [`rerun`](Self::rerun).
    pub async fn run(
        &mut self,
        request: RunRequest,
        token: &CancellationToken,
    ) -> AppResult<RunOutcome> {
        self.diagnostics.begin_run();

        let queue = self.dispatcher.build_queue(&self.tree, &request);
        if queue.is_empty() {
            return Ok(RunOutcome::NothingToRun(
                "No tests found for selection".to_string(),
            ));
        }

        let units = self.dispatcher.plan_units(&queue, &request);
        let summary = self.dispatcher.dispatch(&units, queue, token).await;
        self.diagnostics.project(&summary);
        self.last_request = Some(request);
        Ok(RunOutcome::Completed(summary))
    }

    /// Repeat the most recent run with its original request
    pub async fn rerun(&mut self, token: &CancellationToken) -> AppResult<RunOutcome> {
        let Some(request) = self.last_request.clone() else {
            return Ok(RunOutcome::NothingToRun(
                "No previous test run to repeat".to_string(),
            ));
        };
        self.run(request, token).await
    }

    /// Register a run-on-save subscription; the returned token cancels it
    pub fn watch(&mut self, pattern: WatchPattern, request: RunRequest) -> CancellationToken {
        self.continuous.subscribe(pattern, request)
    }

    /// Replace runner settings. Placement mappings and suites are kept; the
    /// dispatcher and continuous matcher pick up the new values.
    pub fn update_settings(&mut self, settings: RunnerSettings) {
        self.continuous = ContinuousRunMatcher::new(&settings.map_pairs);
        self.dispatcher.set_settings(settings.clone());
        self.settings = settings;
        self.rebuild_placement();
    }

    /// Suite placement applies whenever suites are configured; otherwise the
    /// catalog organizes by autoload namespaces.
    fn rebuild_placement(&mut self) {
        self.placement = if self.suites.is_empty() {
            let mut resolver = NamespaceResolver::new(self.settings.workspace_roots.clone());
            resolver.set_mappings(self.mappings.clone());
            PlacementStrategy::Namespace(resolver)
        } else {
            PlacementStrategy::Suite(SuiteMapper::new(self.suites.clone()))
        };
    }
}
