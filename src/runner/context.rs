//! Execution context for task running
//!
//! The context is handed to every action, criteria and handler. It carries the
//! variables used by shell commands, the logging sink and the data slot filled
//! by the setup hook.

use crate::error::{DataError, DataResult};
use crate::runner::log::{Log, LogLevel, TracingLog};
use std::any::{self, Any};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Execution context that tracks state during a run
pub struct Context {
    /// Current working directory
    pub working_dir: PathBuf,

    /// Build file path
    pub config_path: Option<PathBuf>,

    /// Variables (from the build file, `--var`, `.env`, etc.)
    pub vars: HashMap<String, String>,

    /// Interpreter used for shell commands (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,

    log: Arc<dyn Log>,

    data: Option<TypedData>,
}

struct TypedData {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
    Diagnostic = 4,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: None,
            vars: HashMap::new(),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            verbosity: Verbosity::Normal,
            log: Arc::new(TracingLog),
            data: None,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the build file path
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Set variables
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Replace the logging sink
    pub fn with_log(mut self, log: Arc<dyn Log>) -> Self {
        self.log = log;
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Get a variable value
    pub fn get_var(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// Get the directory for the build file (or current dir)
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.working_dir.clone())
    }

    /// Store the run's data value. The slot is written once per run, by the
    /// setup hook through `SetupContext::set_data`.
    pub(crate) fn set_data<T: 'static>(&mut self, value: T) -> DataResult<()> {
        if let Some(stored) = &self.data {
            return Err(DataError::AlreadyRegistered {
                registered: stored.type_name,
            });
        }
        self.data = Some(TypedData {
            value: Rc::new(value),
            type_name: any::type_name::<T>(),
        });
        Ok(())
    }

    /// Empty the data slot; called by the engine when a run starts
    pub(crate) fn clear_data(&mut self) {
        self.data = None;
    }

    /// Whether a data value has been stored
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Get the data value stored by the setup hook
    pub fn data<T: 'static>(&self) -> DataResult<Rc<T>> {
        let stored = self.data.as_ref().ok_or(DataError::NoDataRegistered)?;
        Rc::clone(&stored.value)
            .downcast::<T>()
            .map_err(|_| DataError::WrongDataType {
                requested: any::type_name::<T>(),
                registered: stored.type_name,
            })
    }

    fn write(&self, minimum: Verbosity, level: LogLevel, message: &str) {
        if self.verbosity >= minimum {
            self.log.write(level, message);
        }
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        self.write(Verbosity::Quiet, LogLevel::Error, message);
    }

    /// Log a warning
    pub fn log_warning(&self, message: &str) {
        self.write(Verbosity::Normal, LogLevel::Warning, message);
    }

    /// Log an informational message
    pub fn log_info(&self, message: &str) {
        self.write(Verbosity::Normal, LogLevel::Information, message);
    }

    /// Log a message shown only in verbose mode
    pub fn log_verbose(&self, message: &str) {
        self.write(Verbosity::Verbose, LogLevel::Verbose, message);
    }

    /// Log a message shown only in diagnostic mode
    pub fn log_debug(&self, message: &str) {
        self.write(Verbosity::Diagnostic, LogLevel::Debug, message);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
