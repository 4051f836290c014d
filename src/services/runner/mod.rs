//! Test Running
//!
//! Queue expansion, execution-unit planning and dispatch, result-stream
//! parsing, failure diagnostics, and run-on-save matching.

pub mod continuous;
pub mod diagnostics;
pub mod dispatcher;
pub mod protocol;
pub mod queue;

pub use continuous::{ContinuousRunMatcher, Retrigger, WatchPattern};
pub use diagnostics::{Annotation, DiagnosticsProjector};
pub use dispatcher::{ExecutionUnit, RunDispatcher};
pub use protocol::TeamCityParser;
pub use queue::{QueueEntry, RunQueue};
