//! The normalized task model
//!
//! Every manifest format is converted into these fixed shapes at load
//! time. Values are immutable after construction; platform resolution
//! produces a new effective task rather than editing in place.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single task definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    /// Task name, unique within a loaded task set
    pub name: String,

    /// Command to run; `None` for alias tasks
    pub cmd: Option<Command>,

    /// Declared positional arguments, in order
    pub args: Vec<TaskArg>,

    /// Dependencies, in declared order
    pub depends_on: Vec<TaskDependency>,

    /// Working directory override, relative to the project root
    pub cwd: Option<PathBuf>,

    /// Environment variable name -> template string
    pub env: BTreeMap<String, String>,

    /// Human-readable description
    pub description: Option<String>,

    /// Input path patterns for the fingerprint cache
    pub inputs: Vec<String>,

    /// Output path patterns for the fingerprint cache
    pub outputs: Vec<String>,

    /// Run with a clean, minimal environment
    pub clean_env: bool,

    /// Named environment to run under when none is requested explicitly
    pub default_environment: Option<String>,

    /// Platform identifier -> sparse override
    pub platforms: BTreeMap<String, TaskOverride>,
}

/// A task command: a single line or parts joined with single spaces
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Line(String),
    Parts(Vec<String>),
}

impl Command {
    /// The command as one string, before template rendering
    pub fn as_line(&self) -> String {
        match self {
            Command::Line(line) => line.clone(),
            Command::Parts(parts) => parts.join(" "),
        }
    }
}

/// A declared positional argument
#[derive(Debug, Clone, PartialEq)]
pub struct TaskArg {
    pub name: String,
    pub default: Option<String>,
}

impl TaskArg {
    /// An argument is required iff it has no default
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A dependency edge to another task
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDependency {
    /// Name of the depended-on task
    pub task: String,

    /// Argument overrides supplied to the dependency, in declared order
    pub args: Vec<DependencyArg>,

    /// Named environment to run the dependency under
    pub environment: Option<String>,
}

impl TaskDependency {
    pub fn new(task: impl Into<String>) -> Self {
        TaskDependency {
            task: task.into(),
            ..Default::default()
        }
    }
}

/// One entry of a dependency's argument override list
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyArg {
    /// A template string assigned positionally, rendered against the
    /// caller's bound arguments
    Positional(String),

    /// Name -> value entries merged into the dependency's argument map
    Named(BTreeMap<String, String>),
}

/// A sparse patch applied when running on a matching platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOverride {
    pub cmd: Option<Command>,
    pub args: Option<Vec<TaskArg>>,
    pub depends_on: Option<Vec<TaskDependency>>,
    pub cwd: Option<PathBuf>,
    pub env: Option<BTreeMap<String, String>>,
    pub inputs: Option<Vec<String>>,
    pub outputs: Option<Vec<String>>,
    pub clean_env: Option<bool>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Task {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An alias groups dependencies under one name and is never executed
    pub fn is_alias(&self) -> bool {
        self.cmd.is_none() && self.platforms.is_empty() && !self.depends_on.is_empty()
    }

    /// Hidden tasks are omitted from listings but remain runnable
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('_')
    }

    /// Produce the effective task for `platform_id`.
    ///
    /// Present override fields replace the base field; absent fields fall
    /// through unchanged. The base task is never mutated, so the same
    /// task can be resolved against several platforms.
    pub fn resolve_for_platform(&self, platform_id: &str) -> Task {
        let Some(patch) = self.platforms.get(platform_id) else {
            return self.clone();
        };

        let mut effective = self.clone();
        if let Some(cmd) = &patch.cmd {
            effective.cmd = Some(cmd.clone());
        }
        if let Some(args) = &patch.args {
            effective.args = args.clone();
        }
        if let Some(deps) = &patch.depends_on {
            effective.depends_on = deps.clone();
        }
        if let Some(cwd) = &patch.cwd {
            effective.cwd = Some(cwd.clone());
        }
        if let Some(env) = &patch.env {
            effective.env = env.clone();
        }
        if let Some(inputs) = &patch.inputs {
            effective.inputs = inputs.clone();
        }
        if let Some(outputs) = &patch.outputs {
            effective.outputs = outputs.clone();
        }
        if let Some(clean_env) = patch.clean_env {
            effective.clean_env = clean_env;
        }
        effective
    }
}
