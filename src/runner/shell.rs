//! Command execution
//!
//! Spawns rendered task commands through a shell interpreter with
//! inherited stdio. The trait seam exists so the orchestrator can be
//! driven by a recording executor in tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};

use crate::error::{ExecutionError, ExecutionResult};

/// How a spawned command should see its environment and filesystem
#[derive(Debug, Clone, Default)]
pub struct ShellRequest {
    pub command: String,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    /// Environment prefix directory; its `bin/` is prepended to PATH
    pub prefix: Option<PathBuf>,
    /// Start from an empty environment instead of inheriting
    pub clean_env: bool,
}

/// Seam between the orchestrator and the operating system
pub trait ShellExecutor {
    /// Run a command to completion and return its exit code
    fn run(&self, task_name: &str, request: &ShellRequest) -> ExecutionResult<i32>;
}

/// Executes commands through `sh -c` with inherited stdio
#[derive(Debug, Clone)]
pub struct SubprocessShell {
    interpreter: Vec<String>,
}

impl Default for SubprocessShell {
    fn default() -> Self {
        SubprocessShell {
            interpreter: vec!["sh".to_string(), "-c".to_string()],
        }
    }
}

impl SubprocessShell {
    pub fn with_interpreter(interpreter: Vec<String>) -> Self {
        SubprocessShell { interpreter }
    }
}

impl ShellExecutor for SubprocessShell {
    fn run(&self, task_name: &str, request: &ShellRequest) -> ExecutionResult<i32> {
        let mut command = StdCommand::new(&self.interpreter[0]);
        if self.interpreter.len() > 1 {
            command.args(&self.interpreter[1..]);
        }
        command.arg(&request.command);
        command.current_dir(&request.cwd);

        command.stdin(Stdio::inherit());
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());

        if request.clean_env {
            command.env_clear();
            command.env("PATH", clean_path());
        }

        if let Some(prefix) = &request.prefix {
            command.env("PATH", prefixed_path(prefix, request.clean_env));
            command.env("TASKRUN_PREFIX", prefix);
        }

        for (key, value) in &request.env {
            command.env(key, value);
        }

        let status = command.status().map_err(|e| ExecutionError::Spawn {
            task: task_name.to_string(),
            message: e.to_string(),
        })?;

        // Signal terminations carry no code; report them as -1
        Ok(status.code().unwrap_or(-1))
    }
}

fn clean_path() -> String {
    "/usr/local/bin:/usr/bin:/bin".to_string()
}

fn prefixed_path(prefix: &Path, clean_env: bool) -> String {
    let base = if clean_env {
        clean_path()
    } else {
        std::env::var("PATH").unwrap_or_else(|_| clean_path())
    };
    format!("{}:{}", prefix.join("bin").display(), base)
}
