//! Fingerprint cache
//!
//! Decides whether a task run can be skipped because its declared inputs
//! are unchanged since the last successful run with the same command and
//! environment. Records live one file per task under
//! `<root>/.taskrun/cache/`, so concurrent runs of different tasks never
//! touch each other's record.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ExecutionError, ExecutionResult};

/// A persisted record of one task's last successful run
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    /// SHA-256 over the rendered command and environment
    fingerprint: String,

    /// Expanded input path -> content signature
    inputs: BTreeMap<String, FileStamp>,

    /// Output paths recorded at save time; all must still exist for the
    /// record to be trusted
    outputs: Vec<String>,

    /// Unix seconds of the last successful run
    saved_at: u64,
}

/// Content signature of one input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FileStamp {
    size: u64,
    /// Nanoseconds since the epoch; `None` when the filesystem reports
    /// no usable timestamp, forcing digest comparison
    mtime_ns: Option<u64>,
    digest: String,
}

/// Per-project fingerprint cache rooted at `<root>/.taskrun/cache`
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    cache_dir: PathBuf,
}

/// Report whether the prior record for `(root, task_name)` still covers
/// the current command, environment and input contents, and all
/// previously recorded outputs exist. Any doubt is a miss.
#[allow(clippy::too_many_arguments)]
pub fn is_cached(
    root: &Path,
    task_name: &str,
    command: &str,
    env: &BTreeMap<String, String>,
    inputs: &[String],
    outputs: &[String],
    cwd: &Path,
) -> bool {
    FingerprintCache::new(root).is_cached(task_name, command, env, inputs, outputs, cwd)
}

/// Persist a fresh record after a successful run
#[allow(clippy::too_many_arguments)]
pub fn save_cache(
    root: &Path,
    task_name: &str,
    command: &str,
    env: &BTreeMap<String, String>,
    inputs: &[String],
    outputs: &[String],
    cwd: &Path,
) -> ExecutionResult<()> {
    FingerprintCache::new(root).save(task_name, command, env, inputs, outputs, cwd)
}

impl FingerprintCache {
    pub fn new(root: &Path) -> Self {
        FingerprintCache {
            cache_dir: root.join(".taskrun").join("cache"),
        }
    }

    pub fn is_cached(
        &self,
        task_name: &str,
        command: &str,
        env: &BTreeMap<String, String>,
        inputs: &[String],
        _outputs: &[String],
        cwd: &Path,
    ) -> bool {
        let Some(record) = self.load_record(task_name) else {
            return false;
        };

        if record.fingerprint != fingerprint_of(command, env) {
            return false;
        }

        let Some(current) = expand_inputs(inputs, cwd) else {
            // A declared input is missing: rebuild rather than ignore it
            return false;
        };

        // Any added or removed input file invalidates the record
        if record.inputs.len() != current.len()
            || !current.iter().all(|p| record.inputs.contains_key(p))
        {
            return false;
        }

        for (path, stored) in &record.inputs {
            if !stamp_matches(Path::new(path), stored) {
                return false;
            }
        }

        // Every output recorded at the last success must still exist
        record.outputs.iter().all(|p| Path::new(p).exists())
    }

    pub fn save(
        &self,
        task_name: &str,
        command: &str,
        env: &BTreeMap<String, String>,
        inputs: &[String],
        outputs: &[String],
        cwd: &Path,
    ) -> ExecutionResult<()> {
        let files = expand_inputs(inputs, cwd).unwrap_or_default();

        let mut stamps = BTreeMap::new();
        for path in files {
            if let Some(stamp) = stamp_of(Path::new(&path)) {
                stamps.insert(path, stamp);
            }
        }

        let record = CacheRecord {
            fingerprint: fingerprint_of(command, env),
            inputs: stamps,
            outputs: expand_outputs(outputs, cwd),
            saved_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| ExecutionError::Cache(e.to_string()))?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| ExecutionError::Cache(e.to_string()))?;
        fs::write(self.record_path(task_name), json)
            .map_err(|e| ExecutionError::Cache(e.to_string()))?;
        Ok(())
    }

    /// Drop the record for one task, if any
    pub fn invalidate(&self, task_name: &str) -> ExecutionResult<()> {
        let path = self.record_path(task_name);
        if path.exists() {
            fs::remove_file(path).map_err(|e| ExecutionError::Cache(e.to_string()))?;
        }
        Ok(())
    }

    fn record_path(&self, task_name: &str) -> PathBuf {
        let safe: String = task_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        // Sanitization collapses distinct names ("a.b" and "a-b"); a
        // short digest of the raw name keeps their records apart
        let mut hasher = Sha256::new();
        hasher.update(task_name.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.cache_dir.join(format!("{safe}-{}.json", &digest[..8]))
    }

    fn load_record(&self, task_name: &str) -> Option<CacheRecord> {
        let contents = fs::read_to_string(self.record_path(task_name)).ok()?;
        serde_json::from_str(&contents).ok()
    }
}

/// SHA-256 over the rendered command and sorted environment
fn fingerprint_of(command: &str, env: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(command.as_bytes());
    hasher.update(b"\n");
    for (key, value) in env {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Expand input patterns relative to `cwd` into a sorted file list.
/// Returns `None` when a literal (non-glob) input path does not exist.
fn expand_inputs(patterns: &[String], cwd: &Path) -> Option<Vec<String>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let full = resolve_pattern(pattern, cwd);
        if is_glob(pattern) {
            if let Ok(paths) = glob::glob(&full) {
                for entry in paths.flatten() {
                    if entry.is_file() {
                        files.push(entry.display().to_string());
                    }
                }
            }
        } else if Path::new(&full).is_file() {
            files.push(full);
        } else {
            return None;
        }
    }

    files.sort();
    files.dedup();
    Some(files)
}

/// Expand output patterns; a pattern matching nothing is recorded
/// verbatim so the record stays untrusted until the output exists.
fn expand_outputs(patterns: &[String], cwd: &Path) -> Vec<String> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let full = resolve_pattern(pattern, cwd);
        if is_glob(pattern) {
            let mut matched = false;
            if let Ok(entries) = glob::glob(&full) {
                for entry in entries.flatten() {
                    matched = true;
                    paths.push(entry.display().to_string());
                }
            }
            if !matched {
                paths.push(full);
            }
        } else {
            paths.push(full);
        }
    }

    paths.sort();
    paths.dedup();
    paths
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn resolve_pattern(pattern: &str, cwd: &Path) -> String {
    let path = Path::new(pattern);
    if path.is_absolute() {
        pattern.to_string()
    } else {
        cwd.join(path).display().to_string()
    }
}

fn stamp_of(path: &Path) -> Option<FileStamp> {
    let meta = fs::metadata(path).ok()?;
    let mtime_ns = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64);
    let contents = fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Some(FileStamp {
        size: meta.len(),
        mtime_ns,
        digest: format!("{:x}", hasher.finalize()),
    })
}

/// Compare a file against its stored stamp. Size + mtime equality means
/// unchanged without reading the file; on mtime mismatch the digest
/// decides, so a touched-but-unchanged file stays cached.
fn stamp_matches(path: &Path, stored: &FileStamp) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if meta.len() != stored.size {
        return false;
    }

    let mtime_ns = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as u64);

    if let (Some(current), Some(recorded)) = (mtime_ns, stored.mtime_ns) {
        if current == recorded {
            return true;
        }
    }

    let Ok(contents) = fs::read(path) else {
        return false;
    };
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    format!("{:x}", hasher.finalize()) == stored.digest
}
