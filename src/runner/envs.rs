//! Environment prefix lookup
//!
//! Named environments map to prefix directories whose `bin/` is put on
//! PATH for the spawned command. Prefixes live under `<root>/.envs/` or
//! any directory listed in `TASKRUN_ENVS_DIRS`.

use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, ExecutionResult};

/// Environment variable listing extra prefix directories, colon separated
pub const ENVS_DIRS_VAR: &str = "TASKRUN_ENVS_DIRS";

/// Seam between the orchestrator and environment storage
pub trait EnvResolver {
    /// Map an environment name to its prefix directory
    fn resolve(&self, name: &str) -> ExecutionResult<PathBuf>;
}

/// Resolves environments by searching on-disk prefix directories
#[derive(Debug, Clone)]
pub struct DirsEnvResolver {
    search_dirs: Vec<PathBuf>,
}

impl DirsEnvResolver {
    /// Search `<root>/.envs` first, then `TASKRUN_ENVS_DIRS` in order
    pub fn for_project(root: &Path) -> Self {
        let mut search_dirs = vec![root.join(".envs")];
        if let Ok(extra) = std::env::var(ENVS_DIRS_VAR) {
            search_dirs.extend(
                extra
                    .split(':')
                    .filter(|d| !d.is_empty())
                    .map(PathBuf::from),
            );
        }
        DirsEnvResolver { search_dirs }
    }

    pub fn with_dirs(search_dirs: Vec<PathBuf>) -> Self {
        DirsEnvResolver { search_dirs }
    }

    /// Environment names available across all search directories
    pub fn known_environments(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .search_dirs
            .iter()
            .filter_map(|dir| std::fs::read_dir(dir).ok())
            .flatten()
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl EnvResolver for DirsEnvResolver {
    fn resolve(&self, name: &str) -> ExecutionResult<PathBuf> {
        for dir in &self.search_dirs {
            let candidate = dir.join(name);
            if candidate.is_dir() {
                return Ok(candidate);
            }
        }
        Err(ExecutionError::UnknownEnvironment {
            name: name.to_string(),
            searched: self
                .search_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect(),
        })
    }
}
