//! Build file validation
//!
//! Checks that serde cannot express. Dependency targets are resolved later,
//! when the engine builds its graph.

use crate::config::types::{Config, TaskConfig};
use crate::error::{require_non_blank, ConfigError, ConfigResult};
use crate::runner::task::name_key;
use std::collections::HashSet;

/// Validate a complete build file
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if matches!(&config.interpreter, Some(interpreter) if interpreter.is_empty()) {
        return Err(ConfigError::Invalid("interpreter cannot be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for (name, task) in &config.tasks {
        require_non_blank(name, "Task name")?;
        if !seen.insert(name_key(name)) {
            return Err(ConfigError::DuplicateTask(name.clone()));
        }
        validate_task(name, task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(name: &str, task: &TaskConfig) -> ConfigResult<()> {
    for dep in task.depends.iter().chain(&task.before) {
        require_non_blank(dep.name(), "Dependency name")?;
    }

    for when in &task.when {
        when.condition()
            .map_err(|e| ConfigError::Invalid(format!("task '{}': {}", name, strip(e))))?;
    }

    if task.continue_on_error && !task.on_error.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "task '{}': continue-on-error and on-error cannot be combined",
            name
        )));
    }

    Ok(())
}

fn strip(err: ConfigError) -> String {
    match err {
        ConfigError::Invalid(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Command, DependencyRef, When};

    fn config_with(name: &str, task: TaskConfig) -> Config {
        Config {
            tasks: vec![(name.to_string(), task)],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let task = TaskConfig {
            description: Some("Test task".to_string()),
            run: vec![Command::Simple("echo test".to_string())],
            ..Default::default()
        };

        assert!(validate_config(&config_with("test", task)).is_ok());
    }

    #[test]
    fn test_validate_empty_interpreter() {
        let config = Config {
            interpreter: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_duplicate_names_ignore_case() {
        let config = Config {
            tasks: vec![
                ("Build".to_string(), TaskConfig::default()),
                ("build".to_string(), TaskConfig::default()),
            ],
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateTask(name)) if name == "build"
        ));
    }

    #[test]
    fn test_validate_blank_dependency() {
        let task = TaskConfig {
            depends: vec![DependencyRef::Simple("  ".to_string())],
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config_with("test", task)),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_when_without_condition() {
        let task = TaskConfig {
            when: vec![When::default()],
            ..Default::default()
        };
        let err = validate_config(&config_with("deploy", task)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: task 'deploy': when entry has no condition"
        );
    }

    #[test]
    fn test_validate_continue_on_error_with_handler() {
        let task = TaskConfig {
            continue_on_error: true,
            on_error: vec![Command::Simple("echo failed".to_string())],
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config_with("test", task)),
            Err(ConfigError::Invalid(_))
        ));
    }
}
