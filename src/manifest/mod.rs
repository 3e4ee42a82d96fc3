//! Manifest parsing and discovery
//!
//! A manifest maps task names to normalized [`model::Task`] values. Each
//! supported file format has a parser adapter; discovery walks from the
//! starting directory upward trying file names in priority order.

pub mod model;
pub mod raw;
pub mod toml;
pub mod yaml;

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ManifestError, ManifestResult};
use model::Task;

/// Interface every manifest format adapter implements
pub trait ManifestParser: Sync {
    /// File names this adapter recognizes
    fn filenames(&self) -> &'static [&'static str];

    /// Whether this adapter knows how to read `path`
    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| self.filenames().contains(&n))
            .unwrap_or(false)
    }

    /// Whether `path` actually carries task definitions. Discovery skips
    /// files that exist but define none, so a bare `pyproject.toml` does
    /// not shadow a manifest further up the tree.
    fn defines_tasks(&self, path: &Path) -> bool {
        let _ = path;
        true
    }

    /// Parse `path` into a mapping of task name -> task
    fn parse(&self, path: &Path) -> ManifestResult<BTreeMap<String, Task>>;

    /// Persist a new task definition into `path`
    fn add_task(&self, path: &Path, name: &str, task: &Task) -> ManifestResult<()>;

    /// Remove the task named `name` from `path`
    fn remove_task(&self, path: &Path, name: &str) -> ManifestResult<()>;
}

/// Registered adapters; earlier entries win during detection
static PARSERS: &[&dyn ManifestParser] = &[&toml::TomlParser, &yaml::YamlParser];

/// Find the adapter that recognizes `path`
pub fn get_parser(path: &Path) -> Option<&'static dyn ManifestParser> {
    PARSERS.iter().copied().find(|p| p.can_handle(path))
}

/// Search `start_dir` and its ancestors for a manifest file
pub fn find_manifest_from(start_dir: &Path) -> ManifestResult<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut searched = Vec::new();

    loop {
        for parser in PARSERS {
            for file_name in parser.filenames() {
                let candidate = current.join(file_name);
                if candidate.is_file() && parser.defines_tasks(&candidate) {
                    return Ok(candidate);
                }
                searched.push(candidate.display().to_string());
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(ManifestError::NotFound(searched.join(", "))),
        }
    }
}

/// Find a manifest starting from the process working directory
pub fn find_manifest() -> ManifestResult<PathBuf> {
    let cwd = env::current_dir()
        .map_err(|e| ManifestError::Invalid(format!("failed to get current directory: {e}")))?;
    find_manifest_from(&cwd)
}

/// Locate and parse a manifest. An explicit `file` path bypasses
/// discovery but must still match a registered adapter.
pub fn detect_and_parse(
    file: Option<&Path>,
) -> ManifestResult<(PathBuf, BTreeMap<String, Task>)> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => find_manifest()?,
    };

    let parser = get_parser(&path).ok_or_else(|| {
        ManifestError::Invalid(format!("no parser for manifest '{}'", path.display()))
    })?;

    let tasks = parser.parse(&path)?;
    Ok((path, tasks))
}
