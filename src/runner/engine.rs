//! Engine: task registry and run orchestration
//!
//! A run goes through these stages:
//!
//! 1. build the graph and compute the execution order (errors here are
//!    returned straight away, setup and teardown never run);
//! 2. run the setup hook once;
//! 3. run every task in order, honoring criteria, error reporter, error
//!    handler, finally handler and the per-task hooks;
//! 4. run the teardown hook once, whatever happened before.
//!
//! The first unhandled error is kept in a single pending slot. Later errors
//! only take the slot while it is empty; otherwise they are logged.

use crate::error::{
    require_non_blank, BriskError, ConfigError, ConfigResult, ExecutionError, GraphError,
    RunFailure,
};
use crate::runner::builder::TaskBuilder;
use crate::runner::graph::TaskGraph;
use crate::runner::hooks::{
    SetupAction, SetupContext, TaskSetupAction, TaskSetupContext, TaskTeardownAction,
    TaskTeardownContext, TeardownAction, TeardownContext,
};
use crate::runner::report::{ExecutionReport, ExecutionStatus, TaskCategory};
use crate::runner::strategy::ExecutionStrategy;
use crate::runner::task::{same_name, Task, TaskInfo};
use crate::runner::Context;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Note recorded for a failure that an error handler took care of
pub const DELEGATED_TO_ERROR_HANDLER: &str = "delegated to error handler";

/// Options for a single run
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    /// Run only the target, ignoring its dependencies
    pub exclusive: bool,
}

/// Task registry plus the global and per-task hooks
#[derive(Default)]
pub struct Engine {
    tasks: Vec<Task>,
    setup: Option<SetupAction>,
    teardown: Option<TeardownAction>,
    task_setup: Option<TaskSetupAction>,
    task_teardown: Option<TaskTeardownAction>,
}

enum TaskOutcome {
    Executed,
    Skipped,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered tasks, in registration order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a task, ignoring case
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| same_name(t.name(), name))
    }

    /// Register a new task and return a builder to configure it
    pub fn register_task(&mut self, name: impl Into<String>) -> ConfigResult<TaskBuilder<'_>> {
        let name = name.into();
        require_non_blank(&name, "Task name")?;
        if self.task(&name).is_some() {
            return Err(ConfigError::DuplicateTask(name));
        }

        let index = self.tasks.len();
        self.tasks.push(Task::new(name)?);
        Ok(TaskBuilder::new(&mut self.tasks[index]))
    }

    /// Hook run once before the first task
    pub fn register_setup<F>(&mut self, action: F) -> ConfigResult<()>
    where
        F: Fn(&mut SetupContext<'_>) -> anyhow::Result<()> + 'static,
    {
        set_once(&mut self.setup, Box::new(action), "The setup action")
    }

    /// Setup hook whose return value becomes the run's data, available to
    /// callbacks registered through `TaskBuilder::with_data`
    pub fn register_setup_with_data<T, F>(&mut self, action: F) -> ConfigResult<()>
    where
        T: 'static,
        F: Fn(&mut SetupContext<'_>) -> anyhow::Result<T> + 'static,
    {
        self.register_setup(move |ctx| {
            let data = action(ctx)?;
            ctx.set_data(data)?;
            Ok(())
        })
    }

    /// Hook run once after the last task, even when the run failed
    pub fn register_teardown<F>(&mut self, action: F) -> ConfigResult<()>
    where
        F: Fn(&mut TeardownContext<'_>) -> anyhow::Result<()> + 'static,
    {
        set_once(&mut self.teardown, Box::new(action), "The teardown action")
    }

    /// Hook run before every task that is not skipped
    pub fn register_task_setup<F>(&mut self, action: F) -> ConfigResult<()>
    where
        F: Fn(&mut TaskSetupContext<'_>) -> anyhow::Result<()> + 'static,
    {
        set_once(&mut self.task_setup, Box::new(action), "The task setup action")
    }

    /// Hook run after every task that is not skipped
    pub fn register_task_teardown<F>(&mut self, action: F) -> ConfigResult<()>
    where
        F: Fn(&mut TaskTeardownContext<'_>) -> anyhow::Result<()> + 'static,
    {
        set_once(&mut self.task_teardown, Box::new(action), "The task teardown action")
    }

    /// Build the task graph from the current registry
    pub fn graph(&self) -> Result<TaskGraph, GraphError> {
        TaskGraph::build(&self.tasks)
    }

    /// Names of the tasks a run of `target` would consider, in order
    pub fn execution_plan(&self, target: &str) -> Result<Vec<String>, GraphError> {
        self.graph()?.traverse_names(target)
    }

    /// Run `target` and everything it depends on
    pub fn run_target(
        &mut self,
        ctx: &mut Context,
        strategy: &dyn ExecutionStrategy,
        target: &str,
    ) -> Result<ExecutionReport, RunFailure> {
        self.run_target_with(ctx, strategy, target, &RunSettings::default())
    }

    #[instrument(skip_all, fields(target = %target, exclusive = settings.exclusive))]
    pub fn run_target_with(
        &mut self,
        ctx: &mut Context,
        strategy: &dyn ExecutionStrategy,
        target: &str,
        settings: &RunSettings,
    ) -> Result<ExecutionReport, RunFailure> {
        let mut report = ExecutionReport::new();
        ctx.clear_data();

        if let Err(err) = require_non_blank(target, "Target") {
            return Err(RunFailure::new(err, report));
        }

        let graph = match self.graph() {
            Ok(graph) => graph,
            Err(err) => return Err(RunFailure::new(err, report)),
        };
        let target_node = match graph.find(target) {
            Some(node) => node,
            None => {
                return Err(RunFailure::new(
                    GraphError::TargetNotFound(target.to_string()),
                    report,
                ))
            }
        };
        let (order, required) = if settings.exclusive {
            let mut required = vec![false; graph.len()];
            required[target_node] = true;
            (vec![target_node], required)
        } else {
            match graph.traverse(target) {
                Ok(order) => (order, graph.required_closure(target_node)),
                Err(err) => return Err(RunFailure::new(err, report)),
            }
        };
        debug!(tasks = order.len(), "execution order computed");

        let Engine {
            tasks,
            setup,
            teardown,
            task_setup,
            task_teardown,
        } = self;

        let mut pending: Option<BriskError> = None;

        // Setup
        let target_info = tasks[target_node].info();
        let plan: Vec<TaskInfo> = order.iter().map(|&node| tasks[node].info()).collect();
        let started = Instant::now();
        let setup_result = {
            let mut setup_ctx = SetupContext::new(ctx, target_info, plan);
            strategy.perform_setup(setup.as_ref(), &mut setup_ctx)
        };
        if setup.is_some() {
            let status = status_of(setup_result.is_ok());
            report.add("Setup", TaskCategory::Setup, status, started.elapsed(), None);
        }
        if let Err(err) = setup_result {
            ctx.log_error(&format!("Error: {}", err));
            pending = Some(ExecutionError::Setup(err).into());
        }

        // Tasks
        if pending.is_none() {
            let mut skipped_required = None;
            for &node in &order {
                let task = &mut tasks[node];
                match execute_task(
                    task,
                    ctx,
                    strategy,
                    task_setup.as_ref(),
                    task_teardown.as_ref(),
                    &mut report,
                ) {
                    Ok(TaskOutcome::Skipped) if required[node] => {
                        skipped_required.get_or_insert_with(|| task.name().to_string());
                    }
                    Ok(_) => {}
                    Err(err) => {
                        pending = Some(err);
                        break;
                    }
                }
            }

            if let Some(skipped) = skipped_required.filter(|_| pending.is_none()) {
                pending = Some(
                    GraphError::TargetUnreachable {
                        target: tasks[target_node].name().to_string(),
                        skipped,
                    }
                    .into(),
                );
            }
        }

        // Teardown
        let started = Instant::now();
        let teardown_result = {
            let mut teardown_ctx = TeardownContext::new(ctx, pending.as_ref());
            strategy.perform_teardown(teardown.as_ref(), &mut teardown_ctx)
        };
        if teardown.is_some() {
            let status = status_of(teardown_result.is_ok());
            report.add("Teardown", TaskCategory::Teardown, status, started.elapsed(), None);
        }
        if let Err(err) = teardown_result {
            ctx.log_error(&format!("Teardown error: {}", err));
            if pending.is_none() {
                pending = Some(ExecutionError::Teardown(err).into());
            }
        }

        match pending {
            Some(err) => Err(RunFailure::new(err, report)),
            None => Ok(report),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, what: &str) -> ConfigResult<()> {
    if slot.is_some() {
        return Err(ConfigError::HandlerAlreadySet(what.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn status_of(succeeded: bool) -> ExecutionStatus {
    if succeeded {
        ExecutionStatus::Executed
    } else {
        ExecutionStatus::Failed
    }
}

/// Run one task through criteria, per-task hooks and the error policy
fn execute_task(
    task: &mut Task,
    ctx: &mut Context,
    strategy: &dyn ExecutionStrategy,
    task_setup: Option<&TaskSetupAction>,
    task_teardown: Option<&TaskTeardownAction>,
    report: &mut ExecutionReport,
) -> Result<TaskOutcome, BriskError> {
    let name = task.name().to_string();

    let unmet = match task.first_unmet_criteria(ctx) {
        Ok(unmet) => unmet.map(|criteria| criteria.message().map(str::to_string)),
        Err(err) => {
            ctx.log_error(&format!("Error: {}", err));
            report.add(
                &name,
                TaskCategory::Normal,
                ExecutionStatus::Failed,
                Duration::ZERO,
                None,
            );
            return Err(err);
        }
    };
    if let Some(message) = unmet {
        ctx.log_verbose(&format!("Skipping task: {}", name));
        if let Some(message) = &message {
            ctx.log_verbose(message);
        }
        report.add_skipped(&name, message);
        return Ok(TaskOutcome::Skipped);
    }

    let info = task.info();
    let started = Instant::now();

    let result = {
        let mut setup_ctx = TaskSetupContext::new(ctx, info.clone());
        strategy.perform_task_setup(task_setup, &mut setup_ctx)
    }
    .and_then(|_| strategy.execute(task, ctx));

    let mut failure = None;
    let mut handled = false;
    if let Err(err) = result {
        ctx.log_error(&format!("An error occurred when executing task '{}'.", name));
        ctx.log_error(&format!("Error: {}", err));
        strategy.report_errors(task.error_reporter(), &err, ctx);

        if task.error_handler().is_some() {
            match strategy.handle_errors(task.error_handler(), &err, ctx) {
                Ok(()) => handled = true,
                Err(handler_err) => failure = Some(handler_err),
            }
        } else {
            failure = Some(err);
        }
    }

    if let Err(err) = strategy.invoke_finally(task.finally_handler(), ctx) {
        match failure {
            None => failure = Some(err),
            Some(_) => ctx.log_error(&format!("Finally error ({}): {}", name, err)),
        }
    }

    let duration = started.elapsed();
    let teardown_result = {
        let mut teardown_ctx =
            TaskTeardownContext::new(ctx, info, duration, false, failure.as_ref());
        strategy.perform_task_teardown(task_teardown, &mut teardown_ctx)
    };
    if let Err(err) = teardown_result {
        ctx.log_error(&format!("Task teardown error ({}): {}", name, err));
        if failure.is_none() {
            failure = Some(err);
        }
    }

    if let Some(source) = failure {
        report.add(&name, TaskCategory::Normal, ExecutionStatus::Failed, duration, None);
        return Err(ExecutionError::Task { task: name, source }.into());
    }

    if handled {
        report.add(
            &name,
            TaskCategory::Normal,
            ExecutionStatus::Executed,
            duration,
            Some(DELEGATED_TO_ERROR_HANDLER.to_string()),
        );
    } else if task.has_actions() {
        report.add_executed(&name, duration);
    } else {
        report.add(&name, TaskCategory::Normal, ExecutionStatus::Delegated, Duration::ZERO, None);
    }
    Ok(TaskOutcome::Executed)
}
