//! Contexts handed to the setup and teardown hooks
//!
//! Each context wraps the run's `Context` (reachable through `Deref`) plus the
//! facts that only exist at that point of the run. They are created right
//! before the hook runs and dropped right after.

use crate::error::{BriskError, DataResult};
use crate::runner::task::TaskInfo;
use crate::runner::Context;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Global setup hook
pub type SetupAction = Box<dyn Fn(&mut SetupContext<'_>) -> anyhow::Result<()>>;

/// Global teardown hook
pub type TeardownAction = Box<dyn Fn(&mut TeardownContext<'_>) -> anyhow::Result<()>>;

/// Hook run before every executed task
pub type TaskSetupAction = Box<dyn Fn(&mut TaskSetupContext<'_>) -> anyhow::Result<()>>;

/// Hook run after every executed task
pub type TaskTeardownAction = Box<dyn Fn(&mut TaskTeardownContext<'_>) -> anyhow::Result<()>>;

pub struct SetupContext<'a> {
    context: &'a mut Context,
    target: TaskInfo,
    tasks_to_execute: Vec<TaskInfo>,
}

impl<'a> SetupContext<'a> {
    pub fn new(
        context: &'a mut Context,
        target: TaskInfo,
        tasks_to_execute: Vec<TaskInfo>,
    ) -> Self {
        SetupContext {
            context,
            target,
            tasks_to_execute,
        }
    }

    /// The task the run was started for
    pub fn target(&self) -> &TaskInfo {
        &self.target
    }

    /// Every task the run will consider, in execution order
    pub fn tasks_to_execute(&self) -> &[TaskInfo] {
        &self.tasks_to_execute
    }

    /// Store the run's data value, read by tasks through `Context::data`.
    /// Fails with `AlreadyRegistered` if this run already has data.
    pub fn set_data<T: 'static>(&mut self, value: T) -> DataResult<()> {
        self.context.set_data(value)
    }
}

pub struct TeardownContext<'a> {
    context: &'a mut Context,
    thrown: Option<&'a BriskError>,
}

impl<'a> TeardownContext<'a> {
    pub fn new(context: &'a mut Context, thrown: Option<&'a BriskError>) -> Self {
        TeardownContext { context, thrown }
    }

    /// Whether the run got here without an error
    pub fn successful(&self) -> bool {
        self.thrown.is_none()
    }

    /// The error that ended the run, if any
    pub fn thrown_error(&self) -> Option<&BriskError> {
        self.thrown
    }
}

pub struct TaskSetupContext<'a> {
    context: &'a mut Context,
    task: TaskInfo,
}

impl<'a> TaskSetupContext<'a> {
    pub fn new(context: &'a mut Context, task: TaskInfo) -> Self {
        TaskSetupContext { context, task }
    }

    pub fn task(&self) -> &TaskInfo {
        &self.task
    }
}

pub struct TaskTeardownContext<'a> {
    context: &'a mut Context,
    task: TaskInfo,
    duration: Duration,
    skipped: bool,
    thrown: Option<&'a anyhow::Error>,
}

impl<'a> TaskTeardownContext<'a> {
    pub fn new(
        context: &'a mut Context,
        task: TaskInfo,
        duration: Duration,
        skipped: bool,
        thrown: Option<&'a anyhow::Error>,
    ) -> Self {
        TaskTeardownContext {
            context,
            task,
            duration,
            skipped,
            thrown,
        }
    }

    pub fn task(&self) -> &TaskInfo {
        &self.task
    }

    /// Time spent in the task's actions and error handling
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn skipped(&self) -> bool {
        self.skipped
    }

    /// Whether the task finished without an unhandled error
    pub fn successful(&self) -> bool {
        self.thrown.is_none()
    }

    pub fn thrown_error(&self) -> Option<&anyhow::Error> {
        self.thrown
    }
}

macro_rules! deref_context {
    ($($ty:ident),*) => {
        $(
            impl Deref for $ty<'_> {
                type Target = Context;

                fn deref(&self) -> &Context {
                    &*self.context
                }
            }

            impl DerefMut for $ty<'_> {
                fn deref_mut(&mut self) -> &mut Context {
                    &mut *self.context
                }
            }
        )*
    };
}

deref_context!(SetupContext, TeardownContext, TaskSetupContext, TaskTeardownContext);
