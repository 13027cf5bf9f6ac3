//! Command execution
//!
//! Shell commands from the build file run through the context's interpreter
//! with the context variables exported to the environment.

use crate::config::Command;
use crate::error::{ConfigError, ExecutionError, Result};
use crate::runner::{interpolate, Context};
use std::process::{Command as StdCommand, Stdio};

/// Execute a command in the given context
pub fn execute_command(cmd: &Command, ctx: &Context) -> Result<()> {
    let exec_str = interpolate(cmd.exec(), &ctx.vars)?;

    if !cmd.is_quiet() {
        let print_str =
            interpolate(cmd.print(), &ctx.vars).unwrap_or_else(|_| cmd.print().to_string());
        ctx.log_info(&format!("[RUN] {}", print_str));
    }

    let working_dir = match cmd.dir() {
        Some(dir) => ctx.working_dir.join(interpolate(dir, &ctx.vars)?),
        None => ctx.working_dir.clone(),
    };

    let mut command = shell(&exec_str, ctx)?;
    command
        .current_dir(&working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let status = command.status()?;
    if !status.success() {
        return Err(ExecutionError::CommandFailed(status.code()).into());
    }

    Ok(())
}

/// Check if a command succeeds (for when conditions)
pub fn check_command(cmd_str: &str, ctx: &Context) -> Result<bool> {
    let exec_str = interpolate(cmd_str, &ctx.vars)?;

    let mut command = shell(&exec_str, ctx)?;
    command
        .current_dir(&ctx.working_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    Ok(command.status()?.success())
}

fn shell(exec_str: &str, ctx: &Context) -> Result<StdCommand> {
    let (program, args) = ctx.interpreter.split_first().ok_or_else(|| {
        ConfigError::Invalid("interpreter cannot be empty".to_string())
    })?;

    let mut command = StdCommand::new(program);
    command.args(args).arg(exec_str).envs(&ctx.vars);
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BriskError;
    use std::collections::HashMap;

    #[test]
    fn test_execute_simple_command() {
        let ctx = Context::new();
        let cmd = Command::Simple("echo test".to_string());

        assert!(execute_command(&cmd, &ctx).is_ok());
    }

    #[test]
    fn test_execute_command_exports_variables() {
        let mut vars = HashMap::new();
        vars.insert("BRISK_GREETING".to_string(), "hello".to_string());

        let ctx = Context::new().with_vars(vars);
        let cmd = Command::Simple("test \"$BRISK_GREETING\" = hello".to_string());

        assert!(execute_command(&cmd, &ctx).is_ok());
    }

    #[test]
    fn test_execute_failing_command() {
        let ctx = Context::new();
        let cmd = Command::Simple("exit 3".to_string());

        let result = execute_command(&cmd, &ctx);
        assert!(matches!(
            result,
            Err(BriskError::Execution(ExecutionError::CommandFailed(Some(3))))
        ));
    }

    #[test]
    fn test_check_command() {
        let ctx = Context::new();
        assert!(check_command("true", &ctx).unwrap());
        assert!(!check_command("false", &ctx).unwrap());
    }

    #[test]
    fn test_check_command_with_variable() {
        let mut vars = HashMap::new();
        vars.insert("cmd".to_string(), "true".to_string());

        let ctx = Context::new().with_vars(vars);
        assert!(check_command("${cmd}", &ctx).unwrap());
    }

    #[test]
    fn test_empty_interpreter() {
        let ctx = Context::new().with_interpreter(Vec::new());
        assert!(check_command("true", &ctx).is_err());
    }
}
