//! Test Catalog
//!
//! The catalog tree, the per-file reconciler, and the orchestration service
//! tying synchronization and runs together.

pub mod reconciler;
pub mod service;
pub mod tree;

pub use reconciler::Reconciler;
pub use service::CatalogService;
pub use tree::{CatalogTree, TreeEvent};
