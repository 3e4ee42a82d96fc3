//! Task resolution and execution
//!
//! Everything between a parsed manifest and a finished run: dependency
//! graph ordering, argument binding, template rendering, the fingerprint
//! cache and the orchestrator that drives the shell.

pub mod args;
pub mod cache;
pub mod context;
pub mod envs;
pub mod graph;
pub mod orchestrator;
pub mod shell;
pub mod template;

pub use cache::FingerprintCache;
pub use context::{current_platform, AmbientContext, Printer, Verbosity};
pub use envs::{DirsEnvResolver, EnvResolver};
pub use graph::resolve_execution_order;
pub use orchestrator::{run_target, Orchestrator, RunOptions, RunSummary, TaskState};
pub use shell::{ShellExecutor, ShellRequest, SubprocessShell};
