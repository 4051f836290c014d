//! Workspace Synchronization
//!
//! File-system watching and change classification for workspace roots.

pub mod events;
pub mod watcher;

pub use events::{classify, ChangeKind, FileChangeEvent, WatchedFileKind};
pub use watcher::{WatcherConfig, WorkspaceWatcher};
