//! Fluent task configuration
//!
//! `TaskBuilder` borrows one task entry of the engine's registry and exposes
//! chainable methods over the task mutators. Methods that can fail return
//! `ConfigResult<Self>`, so a chain reads naturally with `?`:
//!
//! ```rust,ignore
//! engine
//!     .register_task("test")?
//!     .description("Run the test suite")
//!     .is_dependent_on("build")?
//!     .does(|ctx| { ctx.log_info("testing"); Ok(()) })
//!     .continue_on_error()?;
//! ```

use crate::error::{ConfigResult, Result};
use crate::runner::task::{Action, Task};
use crate::runner::Context;
use std::marker::PhantomData;
use std::rc::Rc;

/// Chainable configuration over a registered task
pub struct TaskBuilder<'a> {
    task: &'a mut Task,
}

impl<'a> TaskBuilder<'a> {
    pub fn new(task: &'a mut Task) -> Self {
        TaskBuilder { task }
    }

    /// The task being configured
    pub fn task(&self) -> &Task {
        self.task
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.task.set_description(description);
        self
    }

    /// This task cannot run before `name` has run
    pub fn is_dependent_on(self, name: impl Into<String>) -> ConfigResult<Self> {
        self.task.add_dependency(name, true)?;
        Ok(self)
    }

    /// Run `name` first if it is registered, otherwise ignore it
    pub fn is_optionally_dependent_on(self, name: impl Into<String>) -> ConfigResult<Self> {
        self.task.add_dependency(name, false)?;
        Ok(self)
    }

    /// Task `name` cannot run before this task has run
    pub fn is_dependee_of(self, name: impl Into<String>) -> ConfigResult<Self> {
        self.task.add_dependee(name, true)?;
        Ok(self)
    }

    /// Like `is_dependee_of`, ignored when `name` is not registered
    pub fn is_optional_dependee_of(self, name: impl Into<String>) -> ConfigResult<Self> {
        self.task.add_dependee(name, false)?;
        Ok(self)
    }

    /// Skip the task unless `predicate` holds when the task is reached
    pub fn with_criteria<F>(self, predicate: F) -> Self
    where
        F: Fn(&Context) -> bool + 'static,
    {
        let criteria = move |ctx: &Context| -> Result<bool> { Ok(predicate(ctx)) };
        self.task.add_criteria(Box::new(criteria), None);
        self
    }

    /// Like `with_criteria`, with a message recorded when the task is skipped
    pub fn with_criteria_message<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Context) -> bool + 'static,
    {
        let message = Some(message.into());
        let criteria = move |ctx: &Context| -> Result<bool> { Ok(predicate(ctx)) };
        self.task.add_criteria(Box::new(criteria), message);
        self
    }

    /// Criteria whose evaluation can fail; a failure aborts the run
    pub fn with_checked_criteria<F>(self, predicate: F, message: Option<String>) -> Self
    where
        F: Fn(&Context) -> Result<bool> + 'static,
    {
        self.task.add_criteria(Box::new(predicate), message);
        self
    }

    pub fn does<F>(self, action: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<()> + 'static,
    {
        self.task.add_action(Box::new(action));
        self
    }

    /// Run `action` once per item; `items` is only called when the task first executes
    pub fn does_for_each<I, Items, F>(self, items: Items, action: F) -> Self
    where
        I: 'static,
        Items: FnOnce(&Context) -> anyhow::Result<Vec<I>> + 'static,
        F: Fn(&I, &mut Context) -> anyhow::Result<()> + 'static,
    {
        let action = Rc::new(action);
        let expand = move |ctx: &Context| -> anyhow::Result<Vec<Action>> {
            let actions = items(ctx)?
                .into_iter()
                .map(|item| {
                    let action = Rc::clone(&action);
                    Box::new(move |ctx: &mut Context| action(&item, ctx)) as Action
                })
                .collect();
            Ok(actions)
        };
        self.task.add_delayed_action(Box::new(expand));
        self
    }

    pub fn on_error<F>(self, handler: F) -> ConfigResult<Self>
    where
        F: Fn(&anyhow::Error, &mut Context) -> anyhow::Result<()> + 'static,
    {
        self.task.set_error_handler(Box::new(handler))?;
        Ok(self)
    }

    pub fn report_error<F>(self, reporter: F) -> ConfigResult<Self>
    where
        F: Fn(&anyhow::Error) -> anyhow::Result<()> + 'static,
    {
        self.task.set_error_reporter(Box::new(reporter))?;
        Ok(self)
    }

    pub fn finally<F>(self, handler: F) -> ConfigResult<Self>
    where
        F: Fn(&mut Context) -> anyhow::Result<()> + 'static,
    {
        self.task.set_finally_handler(Box::new(handler))?;
        Ok(self)
    }

    /// Treat any failure of this task as handled
    pub fn continue_on_error(self) -> ConfigResult<Self> {
        self.on_error(|_, _| Ok(()))
    }

    /// Keep running the remaining actions after one fails and report all failures together
    pub fn defer_on_error(self) -> Self {
        self.task.set_defer_exceptions(true);
        self
    }

    /// Switch to a builder whose callbacks also receive the data set by the setup hook
    pub fn with_data<T: 'static>(self) -> TypedTaskBuilder<'a, T> {
        TypedTaskBuilder {
            inner: self,
            _data: PhantomData,
        }
    }
}

/// Task builder whose callbacks receive the run's data value of type `T`.
///
/// The data is looked up when the callback runs; if the setup hook did not
/// store a `T`, the callback fails with `NoDataRegistered` or `WrongDataType`.
pub struct TypedTaskBuilder<'a, T> {
    inner: TaskBuilder<'a>,
    _data: PhantomData<fn() -> T>,
}

impl<'a, T: 'static> TypedTaskBuilder<'a, T> {
    /// Back to the untyped builder
    pub fn untyped(self) -> TaskBuilder<'a> {
        self.inner
    }

    pub fn task(&self) -> &Task {
        self.inner.task()
    }

    pub fn with_criteria<F>(self, predicate: F) -> Self
    where
        F: Fn(&Context, &T) -> bool + 'static,
    {
        self.inner.task.add_criteria(
            Box::new(move |ctx: &Context| -> Result<bool> {
                let data = ctx.data::<T>()?;
                Ok(predicate(ctx, &data))
            }),
            None,
        );
        self
    }

    pub fn with_criteria_message<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Context, &T) -> bool + 'static,
    {
        self.inner.task.add_criteria(
            Box::new(move |ctx: &Context| -> Result<bool> {
                let data = ctx.data::<T>()?;
                Ok(predicate(ctx, &data))
            }),
            Some(message.into()),
        );
        self
    }

    pub fn does<F>(self, action: F) -> Self
    where
        F: Fn(&mut Context, &T) -> anyhow::Result<()> + 'static,
    {
        self.inner.task.add_action(Box::new(move |ctx: &mut Context| -> anyhow::Result<()> {
            let data = ctx.data::<T>()?;
            action(ctx, &data)
        }));
        self
    }

    pub fn does_for_each<I, Items, F>(self, items: Items, action: F) -> Self
    where
        I: 'static,
        Items: FnOnce(&Context, &T) -> anyhow::Result<Vec<I>> + 'static,
        F: Fn(&I, &mut Context, &T) -> anyhow::Result<()> + 'static,
    {
        let action = Rc::new(action);
        let expand = move |ctx: &Context| -> anyhow::Result<Vec<Action>> {
            let data = ctx.data::<T>()?;
            let actions = items(ctx, &data)?
                .into_iter()
                .map(|item| {
                    let action = Rc::clone(&action);
                    Box::new(move |ctx: &mut Context| -> anyhow::Result<()> {
                        let data = ctx.data::<T>()?;
                        action(&item, ctx, &data)
                    }) as Action
                })
                .collect();
            Ok(actions)
        };
        self.inner.task.add_delayed_action(Box::new(expand));
        self
    }

    pub fn on_error<F>(self, handler: F) -> ConfigResult<Self>
    where
        F: Fn(&anyhow::Error, &mut Context, &T) -> anyhow::Result<()> + 'static,
    {
        let on_error = move |err: &anyhow::Error, ctx: &mut Context| -> anyhow::Result<()> {
            let data = ctx.data::<T>()?;
            handler(err, ctx, &data)
        };
        self.inner.task.set_error_handler(Box::new(on_error))?;
        Ok(self)
    }

    pub fn finally<F>(self, handler: F) -> ConfigResult<Self>
    where
        F: Fn(&mut Context, &T) -> anyhow::Result<()> + 'static,
    {
        let finally = move |ctx: &mut Context| -> anyhow::Result<()> {
            let data = ctx.data::<T>()?;
            handler(ctx, &data)
        };
        self.inner.task.set_finally_handler(Box::new(finally))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, DataError};
    use std::cell::RefCell;

    #[test]
    fn test_builder_chain_configures_task() {
        let mut task = Task::new("test").unwrap();
        TaskBuilder::new(&mut task)
            .description("Run tests")
            .is_dependent_on("build")
            .unwrap()
            .is_optionally_dependent_on("lint")
            .unwrap()
            .is_dependee_of("package")
            .unwrap()
            .with_criteria(|_| true)
            .does(|_| Ok(()))
            .defer_on_error();

        assert_eq!(task.description(), Some("Run tests"));
        assert_eq!(task.dependencies().len(), 2);
        assert!(!task.dependencies()[1].required);
        assert_eq!(task.dependees()[0].name, "package");
        assert_eq!(task.criteria().len(), 1);
        assert_eq!(task.actions().len(), 1);
        assert!(task.defer_exceptions());
    }

    #[test]
    fn test_continue_on_error_sets_handler_once() {
        let mut task = Task::new("lint").unwrap();
        let builder = TaskBuilder::new(&mut task).continue_on_error().unwrap();
        let result = builder.on_error(|_, _| Ok(()));
        assert!(matches!(result, Err(ConfigError::HandlerAlreadySet(_))));
    }

    #[test]
    fn test_does_for_each_is_lazy() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut task = Task::new("publish").unwrap();

        let sink = seen.clone();
        TaskBuilder::new(&mut task).does_for_each(
            |_| Ok(vec!["a", "b", "c"]),
            move |item, _| {
                sink.borrow_mut().push(item.to_string());
                Ok(())
            },
        );

        assert!(task.actions().is_empty());
        assert!(task.has_actions());

        let mut ctx = Context::new();
        task.materialize(&ctx).unwrap();
        for action in task.actions() {
            action(&mut ctx).unwrap();
        }
        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_typed_action_receives_data() {
        let seen = Rc::new(RefCell::new(String::new()));
        let mut task = Task::new("version").unwrap();

        let sink = seen.clone();
        TaskBuilder::new(&mut task)
            .with_data::<String>()
            .does(move |_, data| {
                sink.borrow_mut().push_str(data);
                Ok(())
            })
            .untyped()
            .description("Print the version");

        assert_eq!(task.description(), Some("Print the version"));
        let mut ctx = Context::new();
        ctx.set_data("1.0.0".to_string()).unwrap();
        task.actions()[0](&mut ctx).unwrap();
        assert_eq!(*seen.borrow(), "1.0.0");
    }

    #[test]
    fn test_typed_action_without_data_fails_at_execution() {
        let mut task = Task::new("version").unwrap();
        TaskBuilder::new(&mut task)
            .with_data::<String>()
            .does(|_, _| Ok(()));

        let mut ctx = Context::new();
        let err = task.actions()[0](&mut ctx).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::NoDataRegistered)
        );
    }

    #[test]
    fn test_typed_criteria_uses_data() {
        let mut task = Task::new("deploy").unwrap();
        TaskBuilder::new(&mut task)
            .with_data::<bool>()
            .with_criteria_message(|_, enabled| *enabled, "deploy disabled");

        let mut ctx = Context::new();
        ctx.set_data(false).unwrap();
        let unmet = task.first_unmet_criteria(&ctx).unwrap();
        assert_eq!(unmet.and_then(|c| c.message()), Some("deploy disabled"));
    }
}
