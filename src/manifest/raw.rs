//! Raw manifest shapes and normalization
//!
//! Manifests accept several shorthand forms for tasks, dependencies and
//! arguments. The serde types here capture every accepted shape with
//! untagged enums; one conversion function per entity maps them into the
//! fixed model in [`crate::manifest::model`]. Both the TOML and the YAML
//! adapters deserialize into these types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{ManifestError, ManifestResult};
use crate::manifest::model::{
    Command, DependencyArg, Task, TaskArg, TaskDependency, TaskOverride,
};

/// Top-level manifest structure
#[derive(Debug, Default, Deserialize)]
pub struct RawManifest {
    /// Task name -> definition
    #[serde(default)]
    pub tasks: BTreeMap<String, RawTask>,

    /// Platform identifier -> platform-specific task table
    #[serde(default)]
    pub target: BTreeMap<String, RawTarget>,
}

/// A `[target.<platform>]` table
#[derive(Debug, Deserialize)]
pub struct RawTarget {
    #[serde(default)]
    pub tasks: BTreeMap<String, RawTask>,
}

/// A task definition in any accepted shorthand
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTask {
    /// Bare command string
    Command(String),

    /// List of dependencies (alias task)
    Dependencies(Vec<RawDependency>),

    /// Full table form
    Detailed(RawTaskDetail),
}

/// The full table form of a task
#[derive(Debug, Default, Deserialize)]
pub struct RawTaskDetail {
    pub cmd: Option<RawCommand>,

    #[serde(default)]
    pub args: Vec<RawArg>,

    #[serde(rename = "depends-on", alias = "depends_on", default)]
    pub depends_on: Vec<RawDependency>,

    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    pub description: Option<String>,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(rename = "clean-env", alias = "clean_env", default)]
    pub clean_env: bool,

    #[serde(rename = "default-environment", alias = "default_environment")]
    pub default_environment: Option<String>,

    /// Per-task platform overrides: `{ "win-64" = { cmd = ... } }`
    #[serde(default)]
    pub target: BTreeMap<String, RawOverride>,
}

/// A command: single string or parts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawCommand {
    Line(String),
    Parts(Vec<String>),
}

/// A declared argument: bare name or `{ arg = ..., default = ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawArg {
    Name(String),
    Detailed {
        arg: String,
        default: Option<String>,
    },
}

/// A dependency: bare task name or full table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawDependency {
    Name(String),
    Detailed {
        task: String,
        #[serde(default)]
        args: Vec<RawDependencyArg>,
        environment: Option<String>,
    },
}

/// A dependency argument override: positional template or name -> value map
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawDependencyArg {
    Positional(String),
    Named(BTreeMap<String, String>),
}

/// A platform override table (any subset of the task fields)
#[derive(Debug, Default, Deserialize)]
pub struct RawOverride {
    pub cmd: Option<RawCommand>,
    pub args: Option<Vec<RawArg>>,
    #[serde(rename = "depends-on", alias = "depends_on")]
    pub depends_on: Option<Vec<RawDependency>>,
    pub cwd: Option<PathBuf>,
    pub env: Option<BTreeMap<String, String>>,
    pub inputs: Option<Vec<String>>,
    pub outputs: Option<Vec<String>>,
    #[serde(rename = "clean-env", alias = "clean_env")]
    pub clean_env: Option<bool>,
}

fn normalize_command(raw: RawCommand) -> Command {
    match raw {
        RawCommand::Line(line) => Command::Line(line),
        RawCommand::Parts(parts) => Command::Parts(parts),
    }
}

fn normalize_arg(raw: RawArg) -> TaskArg {
    match raw {
        RawArg::Name(name) => TaskArg {
            name,
            default: None,
        },
        RawArg::Detailed { arg, default } => TaskArg { name: arg, default },
    }
}

fn normalize_dependency(raw: RawDependency) -> TaskDependency {
    match raw {
        RawDependency::Name(name) => TaskDependency::new(name),
        RawDependency::Detailed {
            task,
            args,
            environment,
        } => TaskDependency {
            task,
            args: args
                .into_iter()
                .map(|a| match a {
                    RawDependencyArg::Positional(tpl) => DependencyArg::Positional(tpl),
                    RawDependencyArg::Named(map) => DependencyArg::Named(map),
                })
                .collect(),
            environment,
        },
    }
}

/// Convert a raw override table into a sparse [`TaskOverride`]
pub fn normalize_override(raw: RawOverride) -> TaskOverride {
    TaskOverride {
        cmd: raw.cmd.map(normalize_command),
        args: raw
            .args
            .map(|args| args.into_iter().map(normalize_arg).collect()),
        depends_on: raw
            .depends_on
            .map(|deps| deps.into_iter().map(normalize_dependency).collect()),
        cwd: raw.cwd,
        env: raw.env,
        inputs: raw.inputs,
        outputs: raw.outputs,
        clean_env: raw.clean_env,
    }
}

/// Convert one raw task value into a [`Task`]
pub fn normalize_task(name: &str, raw: RawTask) -> ManifestResult<Task> {
    let task = match raw {
        RawTask::Command(line) => Task {
            name: name.to_string(),
            cmd: Some(Command::Line(line)),
            ..Default::default()
        },
        RawTask::Dependencies(deps) => Task {
            name: name.to_string(),
            depends_on: deps.into_iter().map(normalize_dependency).collect(),
            ..Default::default()
        },
        RawTask::Detailed(detail) => Task {
            name: name.to_string(),
            cmd: detail.cmd.map(normalize_command),
            args: detail.args.into_iter().map(normalize_arg).collect(),
            depends_on: detail
                .depends_on
                .into_iter()
                .map(normalize_dependency)
                .collect(),
            cwd: detail.cwd,
            env: detail.env,
            description: detail.description,
            inputs: detail.inputs,
            outputs: detail.outputs,
            clean_env: detail.clean_env,
            default_environment: detail.default_environment,
            platforms: detail
                .target
                .into_iter()
                .map(|(platform, ov)| (platform, normalize_override(ov)))
                .collect(),
        },
    };

    validate_task(&task)?;
    Ok(task)
}

/// Normalize a whole manifest, folding `[target.<platform>.tasks]` tables
/// into per-task platform overrides.
pub fn normalize_manifest(raw: RawManifest) -> ManifestResult<BTreeMap<String, Task>> {
    let mut tasks = BTreeMap::new();
    for (name, defn) in raw.tasks {
        let task = normalize_task(&name, defn)?;
        tasks.insert(name, task);
    }

    for (platform, target) in raw.target {
        for (name, defn) in target.tasks {
            let override_ = raw_task_to_override(defn);
            match tasks.get_mut(&name) {
                Some(existing) => {
                    existing.platforms.insert(platform.clone(), override_);
                }
                None => {
                    // Platform-only task: exists solely through its override
                    let mut task = Task::new(name.clone());
                    task.platforms.insert(platform.clone(), override_);
                    tasks.insert(name, task);
                }
            }
        }
    }

    Ok(tasks)
}

fn raw_task_to_override(raw: RawTask) -> TaskOverride {
    match raw {
        RawTask::Command(line) => TaskOverride {
            cmd: Some(Command::Line(line)),
            ..Default::default()
        },
        RawTask::Dependencies(deps) => TaskOverride {
            depends_on: Some(deps.into_iter().map(normalize_dependency).collect()),
            ..Default::default()
        },
        RawTask::Detailed(detail) => TaskOverride {
            cmd: detail.cmd.map(normalize_command),
            args: if detail.args.is_empty() {
                None
            } else {
                Some(detail.args.into_iter().map(normalize_arg).collect())
            },
            depends_on: if detail.depends_on.is_empty() {
                None
            } else {
                Some(
                    detail
                        .depends_on
                        .into_iter()
                        .map(normalize_dependency)
                        .collect(),
                )
            },
            cwd: detail.cwd,
            env: if detail.env.is_empty() {
                None
            } else {
                Some(detail.env)
            },
            inputs: if detail.inputs.is_empty() {
                None
            } else {
                Some(detail.inputs)
            },
            outputs: if detail.outputs.is_empty() {
                None
            } else {
                Some(detail.outputs)
            },
            clean_env: if detail.clean_env { Some(true) } else { None },
        },
    }
}

fn validate_task(task: &Task) -> ManifestResult<()> {
    let mut seen = std::collections::BTreeSet::new();
    for arg in &task.args {
        if !seen.insert(arg.name.as_str()) {
            return Err(ManifestError::DuplicateArgument {
                task: task.name.clone(),
                arg: arg.name.clone(),
            });
        }
    }
    Ok(())
}
