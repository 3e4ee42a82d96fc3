//! Common test utilities

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary project with a manifest of the given file name
pub fn project_with_manifest(file_name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(file_name);
    fs::write(&path, content).unwrap();
    (dir, path)
}

/// Create a temporary project with a `tasks.toml`
pub fn toml_project(content: &str) -> (TempDir, PathBuf) {
    project_with_manifest("tasks.toml", content)
}

/// Create a temporary project with a `tasks.yml`
#[allow(dead_code)]
pub fn yaml_project(content: &str) -> (TempDir, PathBuf) {
    project_with_manifest("tasks.yml", content)
}
