//! Taskrun - a TOML/YAML project task runner
//!
//! Taskrun resolves a task's transitive dependencies into a
//! deterministic execution order, binds positional and dependency
//! arguments, applies platform overrides, and skips tasks whose inputs
//! are unchanged via a content-addressed fingerprint cache.

pub mod cli;
pub mod error;
pub mod manifest;
pub mod runner;

pub use error::{Result, TaskrunError};

/// Current version of taskrun
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
