//! Error types for taskrun

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for taskrun operations
pub type Result<T> = std::result::Result<T, TaskrunError>;

/// Main error type for taskrun
#[derive(Error, Debug)]
pub enum TaskrunError {
    /// Manifest discovery and parsing errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Dependency graph resolution errors
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Manifest discovery, parsing and write-back errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("No task file found (searched: {0})")]
    NotFound(String),

    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to read '{path}': {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write '{path}': {message}")]
    Write { path: PathBuf, message: String },

    #[error("'{0}' is a read-only format; use a tasks.yml manifest for task editing")]
    ReadOnlyFormat(PathBuf),

    #[error("Task '{0}' is not defined in the manifest")]
    NoSuchTask(String),

    #[error("Task '{task}' declares argument '{arg}' more than once")]
    DuplicateArgument { task: String, arg: String },

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// Dependency graph errors, detected before any process is spawned
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Task '{name}' not found (known tasks: {})", known.join(", "))]
    TaskNotFound { name: String, known: Vec<String> },

    #[error("Cyclic dependency detected: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Missing required argument '{arg}' for task '{task}'")]
    MissingArgument { task: String, arg: String },

    #[error("Task '{task}' failed with exit code {code}")]
    TaskFailed { task: String, code: i32 },

    #[error("Failed to spawn command for task '{task}': {message}")]
    Spawn { task: String, message: String },

    #[error("Environment '{name}' not found (searched: {})", searched.join(", "))]
    UnknownEnvironment { name: String, searched: Vec<String> },

    #[error("Cache error: {0}")]
    Cache(String),
}

/// Template rendering errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Recursive interpolation detected")]
    RecursiveInterpolation,
}

/// Specialized result type for manifest operations
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Specialized result type for graph resolution
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for template rendering
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;
