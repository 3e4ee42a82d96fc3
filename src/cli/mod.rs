//! CLI interface and argument parsing

pub mod app;

pub use app::{build_command, run};
