//! Run Dispatcher
//!
//! Expands a node selection into a run queue, partitions it by workspace
//! root into execution units, and sequences the external-process
//! invocations. Units dispatch strictly in sequence; a single cancellation
//! signal prevents further units from starting and terminates the in-flight
//! process, retaining results collected so far.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::{NodeKind, RunRequest, RunSelection, RunSummary};
use crate::services::catalog::CatalogTree;
use crate::services::runner::protocol::{ResultStream, TeamCityParser};
use crate::services::runner::queue::{QueueEntry, RunQueue};
use crate::models::RunnerSettings;
use crate::utils::error::{AppError, AppResult};

/// One external-process invocation covering one workspace root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Coverage artifact the process writes when coverage was requested;
    /// read after exit and removed unconditionally
    pub coverage_file: Option<PathBuf>,
}

/// Builds and sequences execution units for a run
#[derive(Debug)]
pub struct RunDispatcher {
    settings: RunnerSettings,
}

impl RunDispatcher {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RunnerSettings) {
        self.settings = settings;
    }

    /// Expand a selection to qualifying method leaves. A leaf qualifies
    /// under a tag filter when it carries the requested tag, or
    /// unconditionally when no filter is set.
    pub fn build_queue(&self, tree: &CatalogTree, request: &RunRequest) -> RunQueue {
        let leaves = match &request.selection {
            RunSelection::All => tree.all_method_leaves(),
            RunSelection::Node(id) => tree.method_leaves(id),
        };

        let mut queue = RunQueue::new();
        for id in leaves {
            let Some(node) = tree.get(&id) else { continue };
            if let Some(tag) = &request.tag {
                if !node.tags.contains(tag) {
                    continue;
                }
            }

            let class_label = node
                .parent
                .as_ref()
                .and_then(|p| tree.get(p))
                .filter(|p| p.kind == NodeKind::Class)
                .map(|p| p.label.clone())
                .unwrap_or_default();

            queue.insert(QueueEntry {
                node_id: id.clone(),
                full_name: format!("{}::{}", class_label, node.label),
                file: node.location.clone(),
                workspace_root: node.workspace_root.clone(),
            });
        }
        queue
    }

    /// Partition the queue by workspace root into execution units, one per
    /// distinct root, even when a single run spans several roots.
    pub fn plan_units(&self, queue: &RunQueue, request: &RunRequest) -> Vec<ExecutionUnit> {
        let mut by_root: BTreeMap<PathBuf, Vec<&QueueEntry>> = BTreeMap::new();
        for entry in queue.entries() {
            let root = entry
                .workspace_root
                .clone()
                .or_else(|| entry.file.parent().map(PathBuf::from))
                .unwrap_or_default();
            by_root.entry(root).or_default().push(entry);
        }

        by_root
            .into_iter()
            .map(|(root, entries)| {
                let mut args = vec![self.settings.phpunit_path.clone(), "--teamcity".to_string()];
                args.extend(self.settings.extra_args.iter().cloned());

                if request.selection != RunSelection::All {
                    let alternation = entries
                        .iter()
                        .map(|e| regex::escape(&e.full_name))
                        .collect::<Vec<_>>()
                        .join("|");
                    args.push("--filter".to_string());
                    args.push(format!("^({})$", alternation));
                }

                let coverage_file = request
                    .coverage
                    .then(|| root.join(".phpunit.coverage.xml"));
                if let Some(path) = &coverage_file {
                    args.push("--coverage-clover".to_string());
                    args.push(path.display().to_string());
                }

                ExecutionUnit {
                    command: self.settings.php_command.clone(),
                    args,
                    working_dir: root,
                    coverage_file,
                }
            })
            .collect()
    }

    /// Run the units in sequence, feeding their stdout line streams through
    /// the result parser. Spawn failures and non-zero exits surface through
    /// the summary, never as a hard failure of the run itself; cancellation
    /// yields a partial summary.
    pub async fn dispatch(
        &self,
        units: &[ExecutionUnit],
        queue: RunQueue,
        token: &CancellationToken,
    ) -> RunSummary {
        let mut parser = TeamCityParser::new(queue);
        let mut fatal: Vec<String> = Vec::new();
        let mut coverage: Vec<String> = Vec::new();

        for unit in units {
            if token.is_cancelled() {
                debug!("run cancelled, skipping remaining execution units");
                break;
            }

            if let Err(e) = self.run_unit(unit, &mut parser, &mut fatal, token).await {
                fatal.push(e.to_string());
            }

            if let Some(path) = &unit.coverage_file {
                match tokio::fs::read_to_string(path).await {
                    Ok(content) => coverage.push(content),
                    Err(e) => debug!(path = %path.display(), error = %e,
                        "coverage artifact unreadable"),
                }
                let _ = tokio::fs::remove_file(path).await;
            }
        }

        let mut summary = parser.finish();
        summary.fatal.extend(fatal);
        summary.coverage = coverage;
        summary
    }

    async fn run_unit(
        &self,
        unit: &ExecutionUnit,
        parser: &mut dyn ResultStream,
        fatal: &mut Vec<String>,
        token: &CancellationToken,
    ) -> AppResult<()> {
        let mut child = Command::new(&unit.command)
            .args(&unit.args)
            .current_dir(&unit.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::command(format!("Failed to spawn {}: {}", unit.command, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::command("Failed to capture test process stdout"))?;
        let stderr = child.stderr.take();

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(stderr) = stderr {
                let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            }
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    // Forward as a termination request to the in-flight
                    // process; results already fed in are kept.
                    let _ = child.start_kill();
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => parser.process_line(&line),
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "stdout stream ended abnormally");
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AppError::command(format!("Failed to wait for test process: {}", e)))?;

        if let Ok(err_output) = stderr_task.await {
            // Stderr is always surfaced as an unattributed fatal-error
            // block, independent of exit code.
            if !err_output.trim().is_empty() {
                fatal.push(err_output);
            }
        }

        if !status.success() && !token.is_cancelled() {
            warn!(code = ?status.code(), dir = %unit.working_dir.display(),
                "test process exited non-zero");
        }

        Ok(())
    }
}
