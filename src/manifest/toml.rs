//! TOML manifest adapter
//!
//! Reads `tasks.toml`, `pixi.toml` and `pyproject.toml` files, including
//! pixi-style `[target.<platform>.tasks]` tables. In a `pyproject.toml`
//! the tasks live under `[tool.taskrun]` (with `[tool.pixi]` as a
//! fallback). This format is read-only: task editing goes through the
//! YAML adapter.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use toml::value::Table;
use toml::Value;

use crate::error::{ManifestError, ManifestResult};
use crate::manifest::model::{DependencyArg, Task, TaskDependency, TaskOverride};
use crate::manifest::raw::{normalize_manifest, RawManifest};
use crate::manifest::ManifestParser;

pub struct TomlParser;

fn is_pyproject(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some("pyproject.toml")
}

/// The tool table holding taskrun's manifest inside a `pyproject.toml`
fn tool_table(value: &Value) -> Option<&Value> {
    let tool = value.get("tool")?;
    tool.get("taskrun").or_else(|| tool.get("pixi"))
}

impl ManifestParser for TomlParser {
    fn filenames(&self) -> &'static [&'static str] {
        &["tasks.toml", "pixi.toml", "pyproject.toml"]
    }

    fn defines_tasks(&self, path: &Path) -> bool {
        if !is_pyproject(path) {
            return true;
        }
        fs::read_to_string(path)
            .ok()
            .and_then(|contents| toml::from_str::<Value>(&contents).ok())
            .map(|value| tool_table(&value).is_some())
            .unwrap_or(false)
    }

    fn parse(&self, path: &Path) -> ManifestResult<BTreeMap<String, Task>> {
        let contents = fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let parse_error = |e: toml::de::Error| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let raw: RawManifest = if is_pyproject(path) {
            let value: Value = toml::from_str(&contents).map_err(parse_error)?;
            match tool_table(&value) {
                Some(table) => table.clone().try_into().map_err(parse_error)?,
                None => RawManifest::default(),
            }
        } else {
            toml::from_str(&contents).map_err(parse_error)?
        };

        normalize_manifest(raw)
    }

    fn add_task(&self, path: &Path, _name: &str, _task: &Task) -> ManifestResult<()> {
        Err(ManifestError::ReadOnlyFormat(path.to_path_buf()))
    }

    fn remove_task(&self, path: &Path, _name: &str) -> ManifestResult<()> {
        Err(ManifestError::ReadOnlyFormat(path.to_path_buf()))
    }
}

/// Serialize a normalized task set into manifest TOML. The output parses
/// back through [`TomlParser`] to the same tasks, so any manifest format
/// can be converted to `tasks.toml`.
pub fn export_manifest(tasks: &BTreeMap<String, Task>) -> ManifestResult<String> {
    let mut table = Table::new();
    for (name, task) in tasks {
        table.insert(name.clone(), task_to_toml(task));
    }
    let mut root = Table::new();
    root.insert("tasks".to_string(), Value::Table(table));

    toml::to_string_pretty(&root)
        .map_err(|e| ManifestError::Invalid(format!("export failed: {e}")))
}

/// One task in the tersest shorthand that round-trips: a bare command
/// string, a dependency list, or the full table form.
fn task_to_toml(task: &Task) -> Value {
    let bare = task.args.is_empty()
        && task.cwd.is_none()
        && task.env.is_empty()
        && task.description.is_none()
        && task.inputs.is_empty()
        && task.outputs.is_empty()
        && !task.clean_env
        && task.default_environment.is_none()
        && task.platforms.is_empty();

    match (&task.cmd, bare) {
        (Some(cmd), true) if task.depends_on.is_empty() => {
            return Value::String(cmd.as_line());
        }
        (None, true) if task.depends_on.iter().all(dependency_is_plain) => {
            return Value::Array(
                task.depends_on
                    .iter()
                    .map(|d| Value::String(d.task.clone()))
                    .collect(),
            );
        }
        _ => {}
    }

    let mut table = Table::new();
    if let Some(cmd) = &task.cmd {
        table.insert("cmd".to_string(), Value::String(cmd.as_line()));
    }
    if !task.args.is_empty() {
        let args = task
            .args
            .iter()
            .map(|arg| match &arg.default {
                None => Value::String(arg.name.clone()),
                Some(default) => {
                    let mut entry = Table::new();
                    entry.insert("arg".to_string(), Value::String(arg.name.clone()));
                    entry.insert("default".to_string(), Value::String(default.clone()));
                    Value::Table(entry)
                }
            })
            .collect();
        table.insert("args".to_string(), Value::Array(args));
    }
    if !task.depends_on.is_empty() {
        let deps = task.depends_on.iter().map(dependency_to_toml).collect();
        table.insert("depends-on".to_string(), Value::Array(deps));
    }
    if let Some(cwd) = &task.cwd {
        table.insert("cwd".to_string(), Value::String(cwd.display().to_string()));
    }
    if let Some(description) = &task.description {
        table.insert(
            "description".to_string(),
            Value::String(description.clone()),
        );
    }
    if !task.env.is_empty() {
        table.insert("env".to_string(), string_table(&task.env));
    }
    if !task.inputs.is_empty() {
        table.insert("inputs".to_string(), string_array(&task.inputs));
    }
    if !task.outputs.is_empty() {
        table.insert("outputs".to_string(), string_array(&task.outputs));
    }
    if task.clean_env {
        table.insert("clean-env".to_string(), Value::Boolean(true));
    }
    if let Some(env_name) = &task.default_environment {
        table.insert(
            "default-environment".to_string(),
            Value::String(env_name.clone()),
        );
    }
    if !task.platforms.is_empty() {
        let mut target = Table::new();
        for (platform, patch) in &task.platforms {
            target.insert(platform.clone(), override_to_toml(patch));
        }
        table.insert("target".to_string(), Value::Table(target));
    }
    Value::Table(table)
}

fn dependency_is_plain(dep: &TaskDependency) -> bool {
    dep.args.is_empty() && dep.environment.is_none()
}

fn dependency_to_toml(dep: &TaskDependency) -> Value {
    if dependency_is_plain(dep) {
        return Value::String(dep.task.clone());
    }

    let mut table = Table::new();
    table.insert("task".to_string(), Value::String(dep.task.clone()));
    if !dep.args.is_empty() {
        let args = dep
            .args
            .iter()
            .map(|arg| match arg {
                DependencyArg::Positional(template) => Value::String(template.clone()),
                DependencyArg::Named(map) => string_table(map),
            })
            .collect();
        table.insert("args".to_string(), Value::Array(args));
    }
    if let Some(environment) = &dep.environment {
        table.insert(
            "environment".to_string(),
            Value::String(environment.clone()),
        );
    }
    Value::Table(table)
}

fn override_to_toml(patch: &TaskOverride) -> Value {
    let mut table = Table::new();
    if let Some(cmd) = &patch.cmd {
        table.insert("cmd".to_string(), Value::String(cmd.as_line()));
    }
    if let Some(args) = &patch.args {
        let args = args
            .iter()
            .map(|arg| match &arg.default {
                None => Value::String(arg.name.clone()),
                Some(default) => {
                    let mut entry = Table::new();
                    entry.insert("arg".to_string(), Value::String(arg.name.clone()));
                    entry.insert("default".to_string(), Value::String(default.clone()));
                    Value::Table(entry)
                }
            })
            .collect();
        table.insert("args".to_string(), Value::Array(args));
    }
    if let Some(deps) = &patch.depends_on {
        let deps = deps.iter().map(dependency_to_toml).collect();
        table.insert("depends-on".to_string(), Value::Array(deps));
    }
    if let Some(cwd) = &patch.cwd {
        table.insert("cwd".to_string(), Value::String(cwd.display().to_string()));
    }
    if let Some(env) = &patch.env {
        table.insert("env".to_string(), string_table(env));
    }
    if let Some(inputs) = &patch.inputs {
        table.insert("inputs".to_string(), string_array(inputs));
    }
    if let Some(outputs) = &patch.outputs {
        table.insert("outputs".to_string(), string_array(outputs));
    }
    if let Some(clean_env) = patch.clean_env {
        table.insert("clean-env".to_string(), Value::Boolean(clean_env));
    }
    Value::Table(table)
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn string_table(map: &BTreeMap<String, String>) -> Value {
    Value::Table(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}
