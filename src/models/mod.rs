//! Data Models
//!
//! Contains all data structures used throughout the engine.

pub mod config;
pub mod definition;
pub mod node;
pub mod run;

pub use config::*;
pub use definition::*;
pub use node::*;
pub use run::*;
