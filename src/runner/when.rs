//! When condition evaluation
//!
//! Conditions from the build file become task criteria; every entry of a
//! task's `when` list must hold for the task to run.

use crate::config::WhenCondition;
use crate::error::{ConfigError, Result};
use crate::runner::{check_command, interpolate, Context};
use std::env;

/// Evaluate a single when condition
pub fn evaluate_condition(condition: &WhenCondition, ctx: &Context) -> Result<bool> {
    match condition {
        WhenCondition::Equal { left, right } => {
            Ok(interpolate(left, &ctx.vars)? == interpolate(right, &ctx.vars)?)
        }

        WhenCondition::NotEqual { left, right } => {
            Ok(interpolate(left, &ctx.vars)? != interpolate(right, &ctx.vars)?)
        }

        WhenCondition::Command(cmd) => check_command(cmd, ctx),

        WhenCondition::Exists(pattern) => path_exists(&interpolate(pattern, &ctx.vars)?, ctx),

        WhenCondition::EnvSet(var_name) => {
            Ok(env::var(interpolate(var_name, &ctx.vars)?).is_ok())
        }

        WhenCondition::EnvNotSet(var_name) => {
            Ok(env::var(interpolate(var_name, &ctx.vars)?).is_err())
        }

        WhenCondition::VarSet(name) => Ok(ctx.vars.contains_key(name)),

        WhenCondition::VarNotSet(name) => Ok(!ctx.vars.contains_key(name)),
    }
}

/// Whether any path matches the glob pattern, relative to the working directory
fn path_exists(pattern: &str, ctx: &Context) -> Result<bool> {
    let full = ctx.working_dir.join(pattern);
    let full = full.to_string_lossy();
    let mut matches = glob::glob(&full)
        .map_err(|e| ConfigError::Invalid(format!("invalid pattern '{}': {}", pattern, e)))?;
    Ok(matches.any(|entry| entry.is_ok()))
}
