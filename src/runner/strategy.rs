//! Execution strategies
//!
//! The engine decides *what* runs and in which order; a strategy decides *how*
//! each hook and task is invoked. `DefaultExecutionStrategy` runs everything
//! in place, `DryRunExecutionStrategy` only lists the tasks.

use crate::error::AggregateError;
use crate::runner::hooks::{
    SetupAction, SetupContext, TaskSetupAction, TaskSetupContext, TaskTeardownAction,
    TaskTeardownContext, TeardownAction, TeardownContext,
};
use crate::runner::task::{ErrorHandler, ErrorReporter, FinallyHandler, Task};
use crate::runner::Context;
use std::cell::Cell;

/// How setup, tasks, error handling and teardown are invoked
pub trait ExecutionStrategy {
    fn perform_setup(
        &self,
        action: Option<&SetupAction>,
        ctx: &mut SetupContext<'_>,
    ) -> anyhow::Result<()>;

    fn perform_teardown(
        &self,
        action: Option<&TeardownAction>,
        ctx: &mut TeardownContext<'_>,
    ) -> anyhow::Result<()>;

    fn perform_task_setup(
        &self,
        action: Option<&TaskSetupAction>,
        ctx: &mut TaskSetupContext<'_>,
    ) -> anyhow::Result<()>;

    fn perform_task_teardown(
        &self,
        action: Option<&TaskTeardownAction>,
        ctx: &mut TaskTeardownContext<'_>,
    ) -> anyhow::Result<()>;

    /// Run the task's actions
    fn execute(&self, task: &mut Task, ctx: &mut Context) -> anyhow::Result<()>;

    /// Notify the error reporter; its own failure is logged, never returned
    fn report_errors(
        &self,
        reporter: Option<&ErrorReporter>,
        error: &anyhow::Error,
        ctx: &Context,
    );

    /// Run the error handler; its failure replaces `error`
    fn handle_errors(
        &self,
        handler: Option<&ErrorHandler>,
        error: &anyhow::Error,
        ctx: &mut Context,
    ) -> anyhow::Result<()>;

    fn invoke_finally(&self, handler: Option<&FinallyHandler>, ctx: &mut Context)
        -> anyhow::Result<()>;
}

/// Runs every hook and action sequentially
#[derive(Debug, Default)]
pub struct DefaultExecutionStrategy;

impl ExecutionStrategy for DefaultExecutionStrategy {
    fn perform_setup(
        &self,
        action: Option<&SetupAction>,
        ctx: &mut SetupContext<'_>,
    ) -> anyhow::Result<()> {
        if let Some(action) = action {
            ctx.log_info("Setup");
            ctx.log_verbose("Executing custom setup action...");
            action(ctx)?;
        }
        Ok(())
    }

    fn perform_teardown(
        &self,
        action: Option<&TeardownAction>,
        ctx: &mut TeardownContext<'_>,
    ) -> anyhow::Result<()> {
        if let Some(action) = action {
            ctx.log_info("Teardown");
            ctx.log_verbose("Executing custom teardown action...");
            action(ctx)?;
        }
        Ok(())
    }

    fn perform_task_setup(
        &self,
        action: Option<&TaskSetupAction>,
        ctx: &mut TaskSetupContext<'_>,
    ) -> anyhow::Result<()> {
        if let Some(action) = action {
            let message = format!("Executing custom task setup action ({})...", ctx.task().name);
            ctx.log_verbose(&message);
            action(ctx)?;
        }
        Ok(())
    }

    fn perform_task_teardown(
        &self,
        action: Option<&TaskTeardownAction>,
        ctx: &mut TaskTeardownContext<'_>,
    ) -> anyhow::Result<()> {
        if let Some(action) = action {
            let message = format!("Executing custom task teardown action ({})...", ctx.task().name);
            ctx.log_verbose(&message);
            action(ctx)?;
        }
        Ok(())
    }

    fn execute(&self, task: &mut Task, ctx: &mut Context) -> anyhow::Result<()> {
        ctx.log_info(&format!("Executing task: {}...", task.name()));
        task.materialize(ctx)?;

        if !task.defer_exceptions() {
            for action in task.actions() {
                action(ctx)?;
            }
            return Ok(());
        }

        let mut errors = Vec::new();
        for action in task.actions() {
            if let Err(err) = action(ctx) {
                ctx.log_verbose(&format!("Deferring error: {}", err));
                errors.push(err);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(AggregateError::new(errors).into()),
        }
    }

    fn report_errors(
        &self,
        reporter: Option<&ErrorReporter>,
        error: &anyhow::Error,
        ctx: &Context,
    ) {
        if let Some(reporter) = reporter {
            ctx.log_verbose("Executing custom error reporter...");
            if let Err(err) = reporter(error) {
                ctx.log_error(&format!("Error: {}", err));
            }
        }
    }

    fn handle_errors(
        &self,
        handler: Option<&ErrorHandler>,
        error: &anyhow::Error,
        ctx: &mut Context,
    ) -> anyhow::Result<()> {
        if let Some(handler) = handler {
            ctx.log_verbose("Executing custom error handler...");
            handler(error, ctx)?;
        }
        Ok(())
    }

    fn invoke_finally(
        &self,
        handler: Option<&FinallyHandler>,
        ctx: &mut Context,
    ) -> anyhow::Result<()> {
        if let Some(handler) = handler {
            ctx.log_verbose("Executing custom finally handler...");
            handler(ctx)?;
        }
        Ok(())
    }
}

/// Lists the tasks that would run without invoking any hook or action
#[derive(Debug, Default)]
pub struct DryRunExecutionStrategy {
    counter: Cell<usize>,
}

impl DryRunExecutionStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks listed so far
    pub fn count(&self) -> usize {
        self.counter.get()
    }
}

impl ExecutionStrategy for DryRunExecutionStrategy {
    fn perform_setup(
        &self,
        _: Option<&SetupAction>,
        _: &mut SetupContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn perform_teardown(
        &self,
        _: Option<&TeardownAction>,
        _: &mut TeardownContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn perform_task_setup(
        &self,
        _: Option<&TaskSetupAction>,
        _: &mut TaskSetupContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn perform_task_teardown(
        &self,
        _: Option<&TaskTeardownAction>,
        _: &mut TaskTeardownContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn execute(&self, task: &mut Task, ctx: &mut Context) -> anyhow::Result<()> {
        let index = self.counter.get() + 1;
        self.counter.set(index);
        ctx.log_info(&format!("{}. {}", index, task.name()));
        Ok(())
    }

    fn report_errors(&self, _: Option<&ErrorReporter>, _: &anyhow::Error, _: &Context) {}

    fn handle_errors(
        &self,
        _: Option<&ErrorHandler>,
        _: &anyhow::Error,
        _: &mut Context,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn invoke_finally(&self, _: Option<&FinallyHandler>, _: &mut Context) -> anyhow::Result<()> {
        Ok(())
    }
}
