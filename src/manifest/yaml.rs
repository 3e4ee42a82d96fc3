//! YAML manifest adapter
//!
//! Reads `tasks.yml` / `tasks.yaml` files with the same task shapes as
//! the TOML adapter, and supports write-back for `add` and `remove`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{ManifestError, ManifestResult};
use crate::manifest::model::{Command, Task};
use crate::manifest::raw::{normalize_manifest, RawManifest};
use crate::manifest::ManifestParser;

pub struct YamlParser;

impl ManifestParser for YamlParser {
    fn filenames(&self) -> &'static [&'static str] {
        &["tasks.yml", "tasks.yaml"]
    }

    fn parse(&self, path: &Path) -> ManifestResult<BTreeMap<String, Task>> {
        let contents = read(path)?;

        let raw: RawManifest =
            serde_yaml::from_str(&contents).map_err(|e| ManifestError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        normalize_manifest(raw)
    }

    fn add_task(&self, path: &Path, name: &str, task: &Task) -> ManifestResult<()> {
        let mut doc = load_document(path)?;
        let tasks = tasks_table(&mut doc);
        tasks.insert(Value::String(name.to_string()), task_to_value(task));
        write_document(path, &doc)
    }

    fn remove_task(&self, path: &Path, name: &str) -> ManifestResult<()> {
        let mut doc = load_document(path)?;
        let tasks = tasks_table(&mut doc);
        if tasks.remove(name).is_none() {
            return Err(ManifestError::NoSuchTask(name.to_string()));
        }
        write_document(path, &doc)
    }
}

fn read(path: &Path) -> ManifestResult<String> {
    fs::read_to_string(path).map_err(|e| ManifestError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_document(path: &Path) -> ManifestResult<Mapping> {
    let contents = read(path)?;
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(Value::Mapping(map)) => Ok(map),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(ManifestError::Parse {
            path: path.to_path_buf(),
            message: "manifest root must be a mapping".to_string(),
        }),
        Err(e) => Err(ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn tasks_table(doc: &mut Mapping) -> &mut Mapping {
    let key = Value::String("tasks".to_string());
    if !matches!(doc.get(&key), Some(Value::Mapping(_))) {
        doc.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    match doc.get_mut(&key) {
        Some(Value::Mapping(map)) => map,
        _ => unreachable!("tasks table inserted above"),
    }
}

fn write_document(path: &Path, doc: &Mapping) -> ManifestResult<()> {
    let text = serde_yaml::to_string(doc).map_err(|e| ManifestError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, text).map_err(|e| ManifestError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize a task back into manifest shorthand: a bare string when only
/// a command is set, the full mapping otherwise.
fn task_to_value(task: &Task) -> Value {
    let cmd_line = task.cmd.as_ref().map(Command::as_line);

    let bare = task.depends_on.is_empty()
        && task.description.is_none()
        && task.args.is_empty()
        && task.env.is_empty()
        && task.inputs.is_empty()
        && task.outputs.is_empty();

    if let (Some(line), true) = (&cmd_line, bare) {
        return Value::String(line.clone());
    }

    let mut map = Mapping::new();
    if let Some(line) = cmd_line {
        map.insert(Value::String("cmd".to_string()), Value::String(line));
    }
    if let Some(desc) = &task.description {
        map.insert(
            Value::String("description".to_string()),
            Value::String(desc.clone()),
        );
    }
    if !task.depends_on.is_empty() {
        let deps = task
            .depends_on
            .iter()
            .map(|d| Value::String(d.task.clone()))
            .collect();
        map.insert(Value::String("depends-on".to_string()), Value::Sequence(deps));
    }
    if !task.inputs.is_empty() {
        let inputs = task.inputs.iter().cloned().map(Value::String).collect();
        map.insert(Value::String("inputs".to_string()), Value::Sequence(inputs));
    }
    if !task.outputs.is_empty() {
        let outputs = task.outputs.iter().cloned().map(Value::String).collect();
        map.insert(
            Value::String("outputs".to_string()),
            Value::Sequence(outputs),
        );
    }
    Value::Mapping(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.yml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_yaml_manifest() {
        let (_dir, path) = write_manifest(
            r#"
tasks:
  build: make build
  test:
    cmd: pytest
    depends-on: [build]
"#,
        );
        let tasks = YamlParser.parse(&path).unwrap();
        assert_eq!(tasks["build"].cmd.as_ref().unwrap().as_line(), "make build");
        assert_eq!(tasks["test"].depends_on[0].task, "build");
    }

    #[test]
    fn test_add_task_roundtrip() {
        let (_dir, path) = write_manifest("tasks:\n  build: make\n");

        let mut lint = Task::new("lint");
        lint.cmd = Some(Command::Line("ruff check .".to_string()));
        YamlParser.add_task(&path, "lint", &lint).unwrap();

        let tasks = YamlParser.parse(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks["lint"].cmd.as_ref().unwrap().as_line(), "ruff check .");
    }

    #[test]
    fn test_add_task_with_deps_uses_mapping_form() {
        let (_dir, path) = write_manifest("tasks: {}\n");

        let mut release = Task::new("release");
        release.cmd = Some(Command::Line("publish".to_string()));
        release.depends_on = vec![crate::manifest::model::TaskDependency::new("build")];
        YamlParser.add_task(&path, "release", &release).unwrap();

        let tasks = YamlParser.parse(&path).unwrap();
        assert_eq!(tasks["release"].depends_on[0].task, "build");
    }

    #[test]
    fn test_remove_task() {
        let (_dir, path) = write_manifest("tasks:\n  build: make\n  test: pytest\n");

        YamlParser.remove_task(&path, "test").unwrap();
        let tasks = YamlParser.parse(&path).unwrap();
        assert!(!tasks.contains_key("test"));
        assert!(tasks.contains_key("build"));
    }

    #[test]
    fn test_remove_missing_task() {
        let (_dir, path) = write_manifest("tasks:\n  build: make\n");
        let err = YamlParser.remove_task(&path, "nope").unwrap_err();
        assert!(matches!(err, ManifestError::NoSuchTask(_)));
    }
}
