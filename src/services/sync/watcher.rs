//! Workspace File Watcher
//!
//! Real-time watching of workspace roots using the `notify` crate with
//! debounced event handling. Raw events are classified and forwarded over a
//! channel; the catalog layer decides what a change means.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;
use tracing::warn;

use crate::utils::error::{AppError, AppResult};

use super::events::{classify, ChangeKind, FileChangeEvent};

/// Default debounce duration in milliseconds
const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Configuration for the workspace watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for rapid changes
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Watches workspace roots and emits classified change events.
///
/// Each root holds its own debounced watcher; dropping the service (or
/// calling [`unwatch`](Self::unwatch)) stops the underlying watcher.
pub struct WorkspaceWatcher {
    watchers: HashMap<PathBuf, Debouncer<RecommendedWatcher>>,
    events: mpsc::UnboundedSender<FileChangeEvent>,
    config: WatcherConfig,
}

impl WorkspaceWatcher {
    /// Create a watcher service and the receiving end of its event channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FileChangeEvent>) {
        Self::with_config(WatcherConfig::default())
    }

    pub fn with_config(
        config: WatcherConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FileChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                watchers: HashMap::new(),
                events: tx,
                config,
            },
            rx,
        )
    }

    /// Start watching a workspace root recursively. Idempotent per root.
    pub fn watch_root(&mut self, root: &Path) -> AppResult<()> {
        if self.watchers.contains_key(root) {
            return Ok(());
        }
        if !root.exists() {
            return Err(AppError::not_found(format!(
                "workspace root not found: {}",
                root.display()
            )));
        }

        let events = self.events.clone();
        let root_buf = root.to_path_buf();
        let debounce = Duration::from_millis(self.config.debounce_ms);

        let mut debouncer = new_debouncer(
            debounce,
            move |result: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match result {
                    Ok(batch) => {
                        for event in batch {
                            forward(&events, &root_buf, event);
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "file watch error");
                    }
                }
            },
        )
        .map_err(|e| AppError::internal(format!("failed to create watcher: {}", e)))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| {
                AppError::internal(format!("failed to watch {}: {}", root.display(), e))
            })?;

        self.watchers.insert(root.to_path_buf(), debouncer);
        Ok(())
    }

    /// Stop watching a root
    pub fn unwatch(&mut self, root: &Path) {
        self.watchers.remove(root);
    }

    /// Stop all watchers
    pub fn stop_all(&mut self) {
        self.watchers.clear();
    }

    /// Roots currently being watched
    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.watchers.keys().cloned().collect()
    }
}

/// Classify a debounced event and forward it when the catalog cares.
///
/// `notify-debouncer-mini` collapses create/modify/remove into a single
/// kind, so deletion is inferred from the path no longer existing.
fn forward(
    events: &mpsc::UnboundedSender<FileChangeEvent>,
    root: &Path,
    event: notify_debouncer_mini::DebouncedEvent,
) {
    let path = event.path;
    let Some(file_kind) = classify(&path) else {
        return;
    };

    let kind = match event.kind {
        DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous => {
            if path.exists() {
                ChangeKind::Modified
            } else {
                ChangeKind::Deleted
            }
        }
        _ => ChangeKind::Modified,
    };

    let _ = events.send(FileChangeEvent::new(
        path,
        kind,
        file_kind,
        root.to_path_buf(),
    ));
}
