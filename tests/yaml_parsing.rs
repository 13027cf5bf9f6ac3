//! Integration tests for build file parsing and registration

mod common;

use brisk::config::{
    configure_context, find_config_file_from, parse_config, parse_config_file, register_config,
    Command, WhenCondition,
};
use brisk::error::{BriskError, ConfigError, GraphError};
use brisk::runner::{DefaultExecutionStrategy, Engine, ExecutionStatus};
use common::{collecting_context, create_test_config, create_test_config_in_subdir};
use std::fs;

const PROJECT: &str = r#"
name: my-app
usage: My test application

vars:
  configuration: Debug

setup: echo "starting"
teardown:
  - echo "done"

tasks:
  clean:
    description: Remove build output
    run: rm -rf out

  build:
    description: Build the project
    depends: clean
    run:
      - mkdir -p out
      - exec: echo ${configuration} > out/configuration.txt
        print: write configuration
        quiet: true

  test:
    depends:
      - build
      - name: lint
        required: false
    run: test -f out/configuration.txt

  deploy:
    depends: test
    when:
      - equal:
          left: "${configuration}"
          right: Release
        message: release builds only
    run: echo "deploying"
"#;

#[test]
fn test_parse_complete_config() {
    let config = parse_config(PROJECT).unwrap();

    assert_eq!(config.name, Some("my-app".to_string()));
    assert_eq!(config.usage, Some("My test application".to_string()));
    assert_eq!(config.setup, vec![Command::Simple("echo \"starting\"".to_string())]);
    assert_eq!(config.teardown.len(), 1);

    let names: Vec<&str> = config.tasks.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["clean", "build", "test", "deploy"]);

    let build = config.task("build").unwrap();
    assert_eq!(build.run.len(), 2);
    assert!(build.run[1].is_quiet());
    assert_eq!(build.run[1].print(), "write configuration");

    let deploy = config.task("deploy").unwrap();
    assert_eq!(deploy.when[0].message.as_deref(), Some("release builds only"));
    assert!(matches!(
        deploy.when[0].condition().unwrap(),
        WhenCondition::Equal { .. }
    ));
}

#[test]
fn test_run_build_file_target() {
    let (temp_dir, config_path) = create_test_config(PROJECT);
    let config = parse_config_file(&config_path).unwrap();

    let mut engine = Engine::new();
    register_config(&mut engine, &config).unwrap();

    let (ctx, _) = collecting_context();
    let mut ctx = ctx
        .with_working_dir(temp_dir.path().to_path_buf())
        .with_config_path(config_path);
    configure_context(&config, &mut ctx).unwrap();

    let report = engine
        .run_target(&mut ctx, &DefaultExecutionStrategy, "test")
        .unwrap();

    assert_eq!(
        report.tasks_with_status(ExecutionStatus::Executed),
        vec!["clean", "build", "test"]
    );
    let written = fs::read_to_string(temp_dir.path().join("out/configuration.txt")).unwrap();
    assert_eq!(written.trim(), "Debug");
}

#[test]
fn test_when_condition_makes_target_unreachable() {
    let (temp_dir, config_path) = create_test_config(PROJECT);
    let config = parse_config_file(&config_path).unwrap();

    let mut engine = Engine::new();
    register_config(&mut engine, &config).unwrap();

    let (ctx, _) = collecting_context();
    let mut ctx = ctx.with_working_dir(temp_dir.path().to_path_buf());
    configure_context(&config, &mut ctx).unwrap();

    let failure = engine
        .run_target(&mut ctx, &DefaultExecutionStrategy, "deploy")
        .unwrap_err();
    assert!(matches!(
        failure.error,
        BriskError::Graph(GraphError::TargetUnreachable { .. })
    ));
    assert_eq!(
        failure.report.entry("deploy").unwrap().note.as_deref(),
        Some("release builds only")
    );
}

#[test]
fn test_variable_override_enables_task() {
    let (temp_dir, config_path) = create_test_config(PROJECT);
    let config = parse_config_file(&config_path).unwrap();

    let mut engine = Engine::new();
    register_config(&mut engine, &config).unwrap();

    let (ctx, _) = collecting_context();
    let mut ctx = ctx.with_working_dir(temp_dir.path().to_path_buf());
    ctx.set_var("configuration".to_string(), "Release".to_string());
    configure_context(&config, &mut ctx).unwrap();

    let report = engine
        .run_target(&mut ctx, &DefaultExecutionStrategy, "deploy")
        .unwrap();
    assert_eq!(report.entry("deploy").unwrap().status, ExecutionStatus::Executed);
}

#[test]
fn test_missing_dependency_in_build_file() {
    let config = parse_config(
        r#"
tasks:
  build:
    depends: restore
"#,
    )
    .unwrap();

    let mut engine = Engine::new();
    register_config(&mut engine, &config).unwrap();

    let failure = engine
        .run_target(&mut collecting_context().0, &DefaultExecutionStrategy, "build")
        .unwrap_err();
    assert!(matches!(
        failure.error,
        BriskError::Graph(GraphError::MissingDependency { .. })
    ));
}

#[test]
fn test_duplicate_dependency_in_build_file() {
    let config = parse_config(
        r#"
tasks:
  clean:
  build:
    depends: [clean, CLEAN]
"#,
    )
    .unwrap();

    let mut engine = Engine::new();
    assert!(matches!(
        register_config(&mut engine, &config),
        Err(ConfigError::DuplicateDependency { .. })
    ));
}

#[test]
fn test_on_error_receives_error_variable() {
    let (temp_dir, config_path) = create_test_config(
        r#"
tasks:
  build:
    run: exit 2
    on-error: echo "${error}" > failure.txt
    finally: touch finally.txt
"#,
    );
    let config = parse_config_file(&config_path).unwrap();

    let mut engine = Engine::new();
    register_config(&mut engine, &config).unwrap();

    let (ctx, _) = collecting_context();
    let mut ctx = ctx.with_working_dir(temp_dir.path().to_path_buf());
    let report = engine
        .run_target(&mut ctx, &DefaultExecutionStrategy, "build")
        .unwrap();

    assert_eq!(report.entry("build").unwrap().status, ExecutionStatus::Executed);
    let failure = fs::read_to_string(temp_dir.path().join("failure.txt")).unwrap();
    assert!(failure.contains("exit code Some(2)"), "got: {}", failure);
    assert!(temp_dir.path().join("finally.txt").exists());
}

#[test]
fn test_invalid_yaml_is_reported() {
    let result = parse_config("tasks: [unclosed");
    assert!(matches!(result, Err(BriskError::Yaml(_))));
}

#[test]
fn test_find_config_from_subdirectory() {
    let (_temp_dir, config_path, sub_dir) = create_test_config_in_subdir(PROJECT);
    assert_eq!(find_config_file_from(sub_dir).unwrap(), config_path);
}
