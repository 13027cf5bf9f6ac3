//! Task model
//!
//! A `Task` holds the configuration for one unit of work. It is only mutated
//! through `TaskBuilder`, which forwards to the checked mutators below.

use crate::error::{require_non_blank, ConfigError, ConfigResult, Result};
use crate::runner::Context;
use std::collections::VecDeque;
use std::fmt;

/// An action run when the task executes
pub type Action = Box<dyn Fn(&mut Context) -> anyhow::Result<()>>;

/// A thunk expanded into actions the first time the task executes
pub type DelayedAction = Box<dyn FnOnce(&Context) -> anyhow::Result<Vec<Action>>>;

/// Predicate deciding whether a task should run
pub type CriteriaPredicate = Box<dyn Fn(&Context) -> Result<bool>>;

/// Recovers from an action failure; an error returned here replaces the original
pub type ErrorHandler = Box<dyn Fn(&anyhow::Error, &mut Context) -> anyhow::Result<()>>;

/// Notified of an action failure before the error handler runs
pub type ErrorReporter = Box<dyn Fn(&anyhow::Error) -> anyhow::Result<()>>;

/// Runs after the task, whatever the outcome
pub type FinallyHandler = Box<dyn Fn(&mut Context) -> anyhow::Result<()>>;

/// A dependency edge as declared on a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub required: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Dependency {
            name: name.into(),
            required,
        }
    }
}

/// A skip condition
pub struct Criteria {
    predicate: CriteriaPredicate,
    message: Option<String>,
}

impl Criteria {
    /// Evaluate the predicate
    pub fn evaluate(&self, ctx: &Context) -> Result<bool> {
        (self.predicate)(ctx)
    }

    /// Message reported when the criteria is not met
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Read-only summary of a task handed to hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub dependencies: Vec<Dependency>,
}

/// A registered unit of work
pub struct Task {
    name: String,
    description: Option<String>,
    dependencies: Vec<Dependency>,
    dependees: Vec<Dependency>,
    criteria: Vec<Criteria>,
    actions: Vec<Action>,
    delayed_actions: VecDeque<DelayedAction>,
    error_handler: Option<ErrorHandler>,
    error_reporter: Option<ErrorReporter>,
    finally_handler: Option<FinallyHandler>,
    defer_exceptions: bool,
}

impl Task {
    /// Create a task; the name must not be blank
    pub fn new(name: impl Into<String>) -> ConfigResult<Self> {
        let name = name.into();
        require_non_blank(&name, "Task name")?;

        Ok(Task {
            name,
            description: None,
            dependencies: Vec::new(),
            dependees: Vec::new(),
            criteria: Vec::new(),
            actions: Vec::new(),
            delayed_actions: VecDeque::new(),
            error_handler: None,
            error_reporter: None,
            finally_handler: None,
            defer_exceptions: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn dependees(&self) -> &[Dependency] {
        &self.dependees
    }

    pub fn criteria(&self) -> &[Criteria] {
        &self.criteria
    }

    /// Actions that are ready to run (delayed actions excluded until expanded)
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of delayed actions still waiting for expansion
    pub fn pending_actions(&self) -> usize {
        self.delayed_actions.len()
    }

    /// Whether the task has any work to do, expanded or not
    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty() || !self.delayed_actions.is_empty()
    }

    pub fn error_handler(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    pub fn error_reporter(&self) -> Option<&ErrorReporter> {
        self.error_reporter.as_ref()
    }

    pub fn finally_handler(&self) -> Option<&FinallyHandler> {
        self.finally_handler.as_ref()
    }

    pub fn defer_exceptions(&self) -> bool {
        self.defer_exceptions
    }

    /// Summary passed to setup and teardown hooks
    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            dependencies: self.dependencies.clone(),
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Declare that this task depends on `name`
    pub fn add_dependency(&mut self, name: impl Into<String>, required: bool) -> ConfigResult<()> {
        let name = name.into();
        require_non_blank(&name, "Dependency name")?;
        if contains_name(&self.dependencies, &name) {
            return Err(ConfigError::DuplicateDependency {
                task: self.name.clone(),
                name,
                kind: "dependency",
            });
        }
        self.dependencies.push(Dependency::new(name, required));
        Ok(())
    }

    /// Declare that `name` depends on this task
    pub fn add_dependee(&mut self, name: impl Into<String>, required: bool) -> ConfigResult<()> {
        let name = name.into();
        require_non_blank(&name, "Dependee name")?;
        if contains_name(&self.dependees, &name) {
            return Err(ConfigError::DuplicateDependency {
                task: self.name.clone(),
                name,
                kind: "dependee",
            });
        }
        self.dependees.push(Dependency::new(name, required));
        Ok(())
    }

    pub fn add_criteria(&mut self, predicate: CriteriaPredicate, message: Option<String>) {
        self.criteria.push(Criteria { predicate, message });
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn add_delayed_action(&mut self, thunk: DelayedAction) {
        self.delayed_actions.push_back(thunk);
    }

    pub fn set_error_handler(&mut self, handler: ErrorHandler) -> ConfigResult<()> {
        if self.error_handler.is_some() {
            return Err(self.handler_already_set("error handler"));
        }
        self.error_handler = Some(handler);
        Ok(())
    }

    pub fn set_error_reporter(&mut self, reporter: ErrorReporter) -> ConfigResult<()> {
        if self.error_reporter.is_some() {
            return Err(self.handler_already_set("error reporter"));
        }
        self.error_reporter = Some(reporter);
        Ok(())
    }

    pub fn set_finally_handler(&mut self, handler: FinallyHandler) -> ConfigResult<()> {
        if self.finally_handler.is_some() {
            return Err(self.handler_already_set("finally handler"));
        }
        self.finally_handler = Some(handler);
        Ok(())
    }

    pub fn set_defer_exceptions(&mut self, defer: bool) {
        self.defer_exceptions = defer;
    }

    /// Expand delayed actions into ordinary ones, in registration order.
    ///
    /// Each thunk is consumed when it runs, so a second call is a no-op even if
    /// the first one failed part-way.
    pub fn materialize(&mut self, ctx: &Context) -> anyhow::Result<()> {
        while let Some(thunk) = self.delayed_actions.pop_front() {
            let actions = thunk(ctx)?;
            self.actions.extend(actions);
        }
        Ok(())
    }

    /// Evaluate criteria in order, returning the first one that is not met
    pub fn first_unmet_criteria(&self, ctx: &Context) -> Result<Option<&Criteria>> {
        for criteria in &self.criteria {
            if !criteria.evaluate(ctx)? {
                return Ok(Some(criteria));
            }
        }
        Ok(None)
    }

    fn handler_already_set(&self, kind: &str) -> ConfigError {
        ConfigError::HandlerAlreadySet(format!("The {} for task '{}'", kind, self.name))
    }
}

/// Key under which a task name is unique; names compare case-insensitively,
/// with full Unicode lowercasing
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Whether two task names refer to the same task
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || name_key(a) == name_key(b)
}

fn contains_name(list: &[Dependency], name: &str) -> bool {
    list.iter().any(|d| same_name(&d.name, name))
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("dependees", &self.dependees)
            .field("criteria", &self.criteria.len())
            .field("actions", &self.actions.len())
            .field("delayed_actions", &self.delayed_actions.len())
            .field("defer_exceptions", &self.defer_exceptions)
            .finish()
    }
}
