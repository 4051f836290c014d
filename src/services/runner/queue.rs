//! Run Queue
//!
//! Transient map from node ID to the nodes covered by one run, plus a
//! reported-name index so the result stream parser can correlate protocol
//! events back onto catalog entries.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::NodeId;

/// One queued method leaf
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub node_id: NodeId,
    /// The name the tool reports, `Class::method`
    pub full_name: String,
    /// Source file of the method
    pub file: PathBuf,
    /// Workspace root the method's file belongs to
    pub workspace_root: Option<PathBuf>,
}

/// The node set covered by one run
#[derive(Debug, Default)]
pub struct RunQueue {
    entries: HashMap<NodeId, QueueEntry>,
    by_name: HashMap<String, NodeId>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: QueueEntry) {
        self.by_name
            .insert(entry.full_name.clone(), entry.node_id.clone());
        self.entries.insert(entry.node_id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&QueueEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    /// Node IDs covered by the run
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.entries.keys()
    }

    /// Look up an entry by the name the tool reported. Tools may qualify the
    /// class with its namespace; fall back to matching on the bare
    /// `Class::method` form.
    pub fn lookup(&self, reported: &str) -> Option<&QueueEntry> {
        if let Some(id) = self.by_name.get(reported) {
            return self.entries.get(id);
        }
        let bare = match reported.rsplit_once('\\') {
            Some((_, tail)) => tail,
            None => return None,
        };
        self.by_name.get(bare).and_then(|id| self.entries.get(id))
    }
}
