//! Integration tests
//!
//! End-to-end coverage over the public API: catalog synchronization against
//! a real directory tree, the run pipeline against a stand-in process, and
//! run-on-save behavior.

pub mod common;

mod catalog_sync_test;
mod continuous_run_test;
mod run_pipeline_test;
