//! Ambient context and run output
//!
//! The ambient context is an explicit value passed into rendering and
//! orchestration at invocation start, never a global; tests inject a
//! fixed one.

use std::collections::BTreeMap;
use std::env;
use std::env::consts::{ARCH, OS};
use std::path::PathBuf;

use colored::Colorize;

/// Ambient metadata available to every template as `${...}` builtins
#[derive(Debug, Clone)]
pub struct AmbientContext {
    /// Platform identifier, e.g. `linux-64`, `osx-arm64`, `win-64`
    pub platform: String,

    /// Active named environment, if any
    pub active_env_name: Option<String>,

    /// Path of the manifest the tasks were loaded from
    pub manifest_path: PathBuf,

    /// Process working directory at invocation start
    pub init_cwd: PathBuf,
}

impl AmbientContext {
    /// Context for the current process and platform
    pub fn current(manifest_path: PathBuf) -> Self {
        AmbientContext {
            platform: current_platform(),
            active_env_name: None,
            manifest_path,
            init_cwd: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_active_env(mut self, name: Option<String>) -> Self {
        self.active_env_name = name;
        self
    }

    /// The builtin template variables contributed by this context
    pub fn template_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("platform".to_string(), self.platform.clone());
        vars.insert(
            "environment".to_string(),
            self.active_env_name
                .clone()
                .unwrap_or_else(|| "base".to_string()),
        );
        vars.insert(
            "manifest_path".to_string(),
            self.manifest_path.display().to_string(),
        );
        vars.insert(
            "init_cwd".to_string(),
            self.init_cwd.display().to_string(),
        );
        vars
    }
}

/// Platform identifier for the running process
pub fn current_platform() -> String {
    let os = match OS {
        "linux" => "linux",
        "macos" => "osx",
        "windows" => "win",
        other => other,
    };
    let arch = match ARCH {
        "x86_64" => "64",
        "aarch64" => {
            if OS == "macos" {
                "arm64"
            } else {
                "aarch64"
            }
        }
        other => other,
    };
    format!("{os}-{arch}")
}

/// Verbosity levels for run output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    #[default]
    Normal = 2,
    Verbose = 3,
}

/// Writes run progress to stderr, honoring verbosity
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    pub verbosity: Verbosity,
}

impl Printer {
    pub fn new(verbosity: Verbosity) -> Self {
        Printer { verbosity }
    }

    pub fn running(&self, task: &str, cmd: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("  {} {}: {}", "[run]".cyan(), task, cmd);
        }
    }

    pub fn cached(&self, task: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("  {} {}", "[cached]".green(), task);
        }
    }

    pub fn dry_run(&self, task: &str, cmd: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("  {} {}: {}", "[dry-run]".yellow(), task, cmd);
        }
    }

    pub fn detail(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("    {message}");
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Printer::new(Verbosity::Normal)
    }
}
