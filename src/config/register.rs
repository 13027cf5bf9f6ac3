//! Mapping a build file onto the engine
//!
//! Build files go through the same registration API as library callers:
//! every task becomes `Engine::register_task` plus builder calls, and every
//! command list becomes a closure running the commands in order.

use crate::config::types::{Command, Config, TaskConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{
    evaluate_condition, execute_command, interpolate_list, Context, Engine, TaskBuilder,
};
use tracing::debug;

/// Variable holding the current `for-each` item
pub const ITEM_VAR: &str = "item";

/// Variable holding the current task name in task hooks
pub const TASK_VAR: &str = "task";

/// Variable holding the failure message in `on-error` commands
pub const ERROR_VAR: &str = "error";

/// Apply the interpreter, `.env` file and variables of a build file to a context.
///
/// Variables already in the context win over the file's `vars`, which win
/// over the `.env` file.
pub fn configure_context(config: &Config, ctx: &mut Context) -> ConfigResult<()> {
    if let Some(interpreter) = &config.interpreter {
        ctx.interpreter = interpreter.clone();
    }

    let mut vars = std::collections::HashMap::new();
    if let Some(dotenv) = &config.dotenv {
        let path = ctx.config_dir().join(dotenv);
        let entries = dotenvy::from_path_iter(&path).map_err(|e| {
            ConfigError::Invalid(format!("Failed to load {}: {}", path.display(), e))
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| {
                ConfigError::Invalid(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            vars.insert(key, value);
        }
    }
    vars.extend(config.vars.clone());
    vars.extend(ctx.vars.drain());
    ctx.vars = vars;

    Ok(())
}

/// Register every task and hook of a build file with the engine
pub fn register_config(engine: &mut Engine, config: &Config) -> ConfigResult<()> {
    for (name, task) in &config.tasks {
        register_task(engine, name, task)?;
    }

    if !config.setup.is_empty() {
        let commands = config.setup.clone();
        engine.register_setup(move |ctx| run_all(&commands, ctx))?;
    }
    if !config.teardown.is_empty() {
        let commands = config.teardown.clone();
        engine.register_teardown(move |ctx| run_all(&commands, ctx))?;
    }
    if !config.task_setup.is_empty() {
        let commands = config.task_setup.clone();
        engine.register_task_setup(move |ctx| {
            let name = ctx.task().name.clone();
            ctx.set_var(TASK_VAR.to_string(), name);
            run_all(&commands, ctx)
        })?;
    }
    if !config.task_teardown.is_empty() {
        let commands = config.task_teardown.clone();
        engine.register_task_teardown(move |ctx| {
            let name = ctx.task().name.clone();
            ctx.set_var(TASK_VAR.to_string(), name);
            run_all(&commands, ctx)
        })?;
    }

    debug!(tasks = config.tasks.len(), "build file registered");
    Ok(())
}

fn register_task(engine: &mut Engine, name: &str, task: &TaskConfig) -> ConfigResult<()> {
    let mut builder = engine.register_task(name)?;

    if let Some(description) = &task.description {
        builder = builder.description(description.clone());
    }

    for dep in &task.depends {
        builder = if dep.required() {
            builder.is_dependent_on(dep.name())?
        } else {
            builder.is_optionally_dependent_on(dep.name())?
        };
    }
    for dependee in &task.before {
        builder = if dependee.required() {
            builder.is_dependee_of(dependee.name())?
        } else {
            builder.is_optional_dependee_of(dependee.name())?
        };
    }

    for when in &task.when {
        let condition = when.condition()?;
        builder = builder.with_checked_criteria(
            move |ctx| evaluate_condition(&condition, ctx),
            when.message.clone(),
        );
    }

    for command in &task.run {
        let command = command.clone();
        builder = builder.does(move |ctx| Ok(execute_command(&command, ctx)?));
    }

    if let Some(for_each) = &task.for_each {
        let items = for_each.items.clone();
        let command = for_each.command.clone();
        builder = builder.does_for_each(
            move |ctx: &Context| Ok(interpolate_list(&items, &ctx.vars)?),
            move |item: &String, ctx: &mut Context| {
                ctx.set_var(ITEM_VAR.to_string(), item.clone());
                let result = execute_command(&command, ctx);
                ctx.vars.remove(ITEM_VAR);
                Ok(result?)
            },
        );
    }

    builder = handlers(builder, task)?;
    if task.defer_errors {
        builder.defer_on_error();
    }

    Ok(())
}

fn handlers<'a>(mut builder: TaskBuilder<'a>, task: &TaskConfig) -> ConfigResult<TaskBuilder<'a>> {
    if task.continue_on_error {
        builder = builder.continue_on_error()?;
    } else if !task.on_error.is_empty() {
        let commands = task.on_error.clone();
        builder = builder.on_error(move |err, ctx| {
            ctx.set_var(ERROR_VAR.to_string(), err.to_string());
            run_all(&commands, ctx)
        })?;
    }

    if !task.finally.is_empty() {
        let commands = task.finally.clone();
        builder = builder.finally(move |ctx| run_all(&commands, ctx))?;
    }

    Ok(builder)
}

fn run_all(commands: &[Command], ctx: &Context) -> anyhow::Result<()> {
    for command in commands {
        execute_command(command, ctx)?;
    }
    Ok(())
}
