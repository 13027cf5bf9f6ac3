//! Error types for Brisk

use crate::runner::ExecutionReport;
use std::io;
use thiserror::Error;

/// Result type alias for Brisk operations
pub type Result<T> = std::result::Result<T, BriskError>;

/// Main error type for Brisk
#[derive(Error, Debug)]
pub enum BriskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Graph construction and traversal errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Data context errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration errors, raised while tasks and hooks are being registered
/// or while a build file is loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Another task with the name '{0}' has already been added")]
    DuplicateTask(String),

    #[error("Task '{task}' already has a {kind} on '{name}'")]
    DuplicateDependency {
        task: String,
        name: String,
        kind: &'static str,
    },

    #[error("{0} has already been set")]
    HandlerAlreadySet(String),

    #[error("Failed to find build file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors found while building or walking the task graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Task '{task}' references task '{dependency}' which does not exist")]
    MissingDependency { task: String, dependency: String },

    #[error("Another task with the name '{0}' has already been added")]
    DuplicateTask(String),

    #[error("Graph contains circular references (entered at task '{0}')")]
    CyclicDependency(String),

    #[error("The target '{0}' was not found")]
    TargetNotFound(String),

    #[error("Could not reach target '{target}' since task '{skipped}' was skipped due to a criteria")]
    TargetUnreachable { target: String, skipped: String },
}

/// Errors raised while a run is executing
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Setup failed: {0}")]
    Setup(#[source] anyhow::Error),

    #[error("Task '{task}' failed: {source}")]
    Task {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Teardown failed: {0}")]
    Teardown(#[source] anyhow::Error),

    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),
}

/// Errors raised by the typed data accessor on the execution context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("No data has been registered by the setup action")]
    NoDataRegistered,

    #[error("Registered data is of type '{registered}', not '{requested}'")]
    WrongDataType {
        requested: &'static str,
        registered: &'static str,
    },

    #[error("Data of type '{registered}' has already been registered for this run")]
    AlreadyRegistered { registered: &'static str },
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Invalid interpolation syntax: {0}")]
    InvalidSyntax(String),

    #[error("Recursive interpolation detected")]
    RecursiveInterpolation,
}

/// Several action failures collected from one task invocation
#[derive(Error, Debug)]
#[error("{} errors occurred{}", .errors.len(), numbered(.errors))]
pub struct AggregateError {
    errors: Vec<anyhow::Error>,
}

impl AggregateError {
    pub fn new(errors: Vec<anyhow::Error>) -> Self {
        AggregateError { errors }
    }

    /// The inner failures, in the order the actions were declared
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn numbered(errors: &[anyhow::Error]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("\n  {}. {}", i + 1, err))
        .collect()
}

/// A run that ended with an error, together with the report of what did run
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: BriskError,
    pub report: ExecutionReport,
}

impl RunFailure {
    pub fn new(error: impl Into<BriskError>, report: ExecutionReport) -> Self {
        RunFailure {
            error: error.into(),
            report,
        }
    }
}

impl From<RunFailure> for BriskError {
    fn from(failure: RunFailure) -> Self {
        failure.error
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for graph operations
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Specialized result type for data context access
pub type DataResult<T> = std::result::Result<T, DataError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

/// Helper to build an `InvalidArgument` error when a string argument is blank
pub fn require_non_blank(value: &str, what: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidArgument(format!(
            "{} cannot be empty",
            what
        )));
    }
    Ok(())
}
