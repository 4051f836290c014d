//! Service Layer
//!
//! Catalog synchronization, symbol placement, parse collaborators, test
//! running, and workspace watching.

pub mod catalog;
pub mod parsing;
pub mod placement;
pub mod runner;
pub mod sync;
