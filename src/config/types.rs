//! Core configuration types
//!
//! This module defines the data structures that represent a brisk.yml build file.

use crate::error::{ConfigError, ConfigResult};
use crate::runner::task::same_name;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// Top-level build file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Project usage description (optional)
    #[serde(default)]
    pub usage: Option<String>,

    /// Interpreter for shell commands (e.g., ["bash", "-c"])
    #[serde(default)]
    pub interpreter: Option<Vec<String>>,

    /// Initial variables
    #[serde(default)]
    pub vars: HashMap<String, String>,

    /// `.env` file loaded into the variables, relative to the build file
    #[serde(default)]
    pub dotenv: Option<String>,

    /// Commands run once before the first task
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub setup: Vec<Command>,

    /// Commands run once after the last task
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub teardown: Vec<Command>,

    /// Commands run before every executed task
    #[serde(rename = "task-setup", default, deserialize_with = "deserialize_one_or_many")]
    pub task_setup: Vec<Command>,

    /// Commands run after every executed task
    #[serde(rename = "task-teardown", default, deserialize_with = "deserialize_one_or_many")]
    pub task_teardown: Vec<Command>,

    /// Tasks in declaration order
    #[serde(default, deserialize_with = "deserialize_tasks")]
    pub tasks: Vec<(String, TaskConfig)>,
}

impl Config {
    /// Look up a task definition by name, ignoring case
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks
            .iter()
            .find(|(n, _)| same_name(n, name))
            .map(|(_, task)| task)
    }
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Description shown by `--list`
    #[serde(default)]
    pub description: Option<String>,

    /// Tasks that must run before this one
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub depends: Vec<DependencyRef>,

    /// Tasks that must run after this one
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub before: Vec<DependencyRef>,

    /// Conditions that must all hold for the task to run
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub when: Vec<When>,

    /// Commands to execute
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub run: Vec<Command>,

    /// Command run once per item, after `run`
    #[serde(rename = "for-each", default)]
    pub for_each: Option<ForEach>,

    /// Commands run when the task fails; the failure is then considered handled
    #[serde(rename = "on-error", default, deserialize_with = "deserialize_one_or_many")]
    pub on_error: Vec<Command>,

    /// Commands that always run after the task, even on error
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub finally: Vec<Command>,

    /// Ignore failures of this task
    #[serde(rename = "continue-on-error", default)]
    pub continue_on_error: bool,

    /// Run every command even after one fails and report all failures
    #[serde(rename = "defer-errors", default)]
    pub defer_errors: bool,
}

/// A dependency reference: a plain name or `{ name, required }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DependencyRef {
    Simple(String),

    Detailed {
        name: String,
        #[serde(default = "default_required")]
        required: bool,
    },
}

fn default_required() -> bool {
    true
}

impl DependencyRef {
    pub fn name(&self) -> &str {
        match self {
            DependencyRef::Simple(name) => name,
            DependencyRef::Detailed { name, .. } => name,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            DependencyRef::Simple(_) => true,
            DependencyRef::Detailed { required, .. } => *required,
        }
    }
}

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Simple string command
    Simple(String),

    /// Command with additional options
    Complex(CommandDetail),
}

/// Detailed command specification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandDetail {
    /// The command to execute
    pub exec: String,

    /// What to print when running (defaults to exec)
    #[serde(default)]
    pub print: Option<String>,

    /// Don't echo the command
    #[serde(default)]
    pub quiet: bool,

    /// Working directory, relative to the context's working directory
    #[serde(default)]
    pub dir: Option<String>,
}

impl Command {
    pub fn exec(&self) -> &str {
        match self {
            Command::Simple(exec) => exec,
            Command::Complex(detail) => &detail.exec,
        }
    }

    pub fn print(&self) -> &str {
        match self {
            Command::Simple(exec) => exec,
            Command::Complex(detail) => detail.print.as_deref().unwrap_or(&detail.exec),
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Command::Complex(detail) if detail.quiet)
    }

    pub fn dir(&self) -> Option<&str> {
        match self {
            Command::Simple(_) => None,
            Command::Complex(detail) => detail.dir.as_deref(),
        }
    }
}

/// One command per item; the current item is available as `${item}`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForEach {
    /// Items, interpolated when the task first executes
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub items: Vec<String>,

    pub command: Command,
}

/// A condition entry; exactly one condition field must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct When {
    /// Check if values are equal
    #[serde(default)]
    pub equal: Option<WhenComparison>,

    /// Check if values are not equal
    #[serde(rename = "not-equal", default)]
    pub not_equal: Option<WhenComparison>,

    /// Check if a command succeeds
    #[serde(default)]
    pub command: Option<String>,

    /// Check if a path matching the glob pattern exists
    #[serde(default)]
    pub exists: Option<String>,

    /// Check if environment variable is set
    #[serde(rename = "env-set", default)]
    pub env_set: Option<String>,

    /// Check if environment variable is not set
    #[serde(rename = "env-not-set", default)]
    pub env_not_set: Option<String>,

    /// Check if a variable is set
    #[serde(rename = "var-set", default)]
    pub var_set: Option<String>,

    /// Check if a variable is not set
    #[serde(rename = "var-not-set", default)]
    pub var_not_set: Option<String>,

    /// Recorded in the report when the condition skips the task
    #[serde(default)]
    pub message: Option<String>,
}

/// A comparison for when conditions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WhenComparison {
    /// Left-hand side of comparison
    pub left: String,

    /// Right-hand side of comparison
    pub right: String,
}

/// The single condition of a `When` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhenCondition {
    Equal { left: String, right: String },
    NotEqual { left: String, right: String },
    Command(String),
    Exists(String),
    EnvSet(String),
    EnvNotSet(String),
    VarSet(String),
    VarNotSet(String),
}

impl When {
    /// The condition this entry sets; fails unless exactly one is set
    pub fn condition(&self) -> ConfigResult<WhenCondition> {
        let mut conditions = Vec::new();
        if let Some(c) = &self.equal {
            conditions.push(WhenCondition::Equal {
                left: c.left.clone(),
                right: c.right.clone(),
            });
        }
        if let Some(c) = &self.not_equal {
            conditions.push(WhenCondition::NotEqual {
                left: c.left.clone(),
                right: c.right.clone(),
            });
        }
        if let Some(cmd) = &self.command {
            conditions.push(WhenCondition::Command(cmd.clone()));
        }
        if let Some(pattern) = &self.exists {
            conditions.push(WhenCondition::Exists(pattern.clone()));
        }
        if let Some(var) = &self.env_set {
            conditions.push(WhenCondition::EnvSet(var.clone()));
        }
        if let Some(var) = &self.env_not_set {
            conditions.push(WhenCondition::EnvNotSet(var.clone()));
        }
        if let Some(var) = &self.var_set {
            conditions.push(WhenCondition::VarSet(var.clone()));
        }
        if let Some(var) = &self.var_not_set {
            conditions.push(WhenCondition::VarNotSet(var.clone()));
        }

        match conditions.len() {
            1 => Ok(conditions.remove(0)),
            0 => Err(ConfigError::Invalid("when entry has no condition".to_string())),
            n => Err(ConfigError::Invalid(format!(
                "when entry must set exactly one condition, found {}",
                n
            ))),
        }
    }
}

/// Deserialize either a single value or a sequence of values
fn deserialize_one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| serde_yaml::from_value(item).map_err(D::Error::custom))
            .collect(),
        single => Ok(vec![serde_yaml::from_value(single).map_err(D::Error::custom)?]),
    }
}

/// Deserialize the task mapping, keeping declaration order
fn deserialize_tasks<'de, D>(deserializer: D) -> Result<Vec<(String, TaskConfig)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(map) => map
            .into_iter()
            .map(|(key, task)| {
                let name = match key {
                    Value::String(name) => name,
                    other => {
                        return Err(D::Error::custom(format!("invalid task name: {:?}", other)))
                    }
                };
                // `build:` with nothing under it is a task without actions
                let task = match task {
                    Value::Null => TaskConfig::default(),
                    task => serde_yaml::from_value(task)
                        .map_err(|e| D::Error::custom(format!("task '{}': {}", name, e)))?,
                };
                Ok((name, task))
            })
            .collect(),
        _ => Err(D::Error::custom("tasks must be a mapping")),
    }
}
