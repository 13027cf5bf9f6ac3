//! Main CLI application

use crate::config::{
    configure_context, parse_config_auto, parse_config_file, register_config, Config,
};
use crate::error::Result;
use crate::runner::{
    ConsoleReportPrinter, Context, DefaultExecutionStrategy, DryRunExecutionStrategy, Engine,
    ExecutionStrategy, Log, LogLevel, ReportPrinter, RunSettings, Verbosity,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Target run when none is given
pub const DEFAULT_TARGET: &str = "default";

/// CLI application
pub struct App {
    /// Parsed build file
    config: Config,
    /// Build file path
    config_path: PathBuf,
}

impl App {
    /// Load the build file found by walking up from the current directory
    pub fn new() -> Result<Self> {
        let (config, config_path) = parse_config_auto()?;
        Ok(App {
            config,
            config_path,
        })
    }

    /// Load a specific build file
    pub fn with_config_file(path: PathBuf) -> Result<Self> {
        let config = parse_config_file(&path)?;
        Ok(App {
            config,
            config_path: path,
        })
    }

    /// Engine with every task and hook of the build file registered
    pub fn engine(&self) -> Result<Engine> {
        let mut engine = Engine::new();
        register_config(&mut engine, &self.config)?;
        Ok(engine)
    }

    /// Execution context for this build file
    pub fn context(&self, verbosity: Verbosity, vars: Vec<(String, String)>) -> Result<Context> {
        let mut ctx = Context::new()
            .with_config_path(self.config_path.clone())
            .with_verbosity(verbosity)
            .with_log(Arc::new(ConsoleLog));
        if let Some(dir) = self.config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            ctx.working_dir = dir.to_path_buf();
        }
        for (key, value) in vars {
            ctx.set_var(key, value);
        }
        configure_context(&self.config, &mut ctx)?;
        Ok(ctx)
    }

    /// Run the application with parsed command line arguments
    pub fn run(&self, matches: &ArgMatches) -> Result<()> {
        let mut engine = self.engine()?;
        let target = matches
            .get_one::<String>("target")
            .map(String::as_str)
            .unwrap_or(DEFAULT_TARGET);

        if matches.get_flag("list") {
            print_tasks(&engine, &self.config);
            return Ok(());
        }

        if matches.get_flag("tree") {
            for (i, name) in engine.execution_plan(target)?.iter().enumerate() {
                println!("{}. {}", i + 1, name);
            }
            return Ok(());
        }

        let verbosity = get_verbosity(matches);
        let vars = matches
            .get_many::<(String, String)>("var")
            .map(|vars| vars.cloned().collect())
            .unwrap_or_default();
        let mut ctx = self.context(verbosity, vars)?;

        let dry_run = matches.get_flag("dry-run");
        let strategy: Box<dyn ExecutionStrategy> = if dry_run {
            ctx.log_info("Performing dry run...");
            ctx.log_info("Target will be executed without invoking any actions.");
            Box::new(DryRunExecutionStrategy::new())
        } else {
            Box::new(DefaultExecutionStrategy)
        };

        let settings = RunSettings {
            exclusive: matches.get_flag("exclusive"),
        };
        let printer = ConsoleReportPrinter;

        match engine.run_target_with(&mut ctx, strategy.as_ref(), target, &settings) {
            Ok(report) => {
                if dry_run {
                    ctx.log_info("This was a dry run.");
                } else if verbosity > Verbosity::Quiet {
                    printer.write(&report);
                }
                Ok(())
            }
            Err(failure) => {
                if !dry_run && verbosity > Verbosity::Quiet {
                    printer.write(&failure.report);
                }
                Err(failure.into())
            }
        }
    }
}

/// Log sink writing user-facing messages to stderr
#[derive(Debug, Default)]
pub struct ConsoleLog;

impl Log for ConsoleLog {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => eprintln!("{}", message.red()),
            LogLevel::Warning => eprintln!("{}", message.yellow()),
            LogLevel::Information => eprintln!("{}", message),
            LogLevel::Verbose | LogLevel::Debug => eprintln!("{}", message.dimmed()),
        }
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("brisk")
        .version(crate::VERSION)
        .about("A task graph build engine driven by brisk.yml files")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Task to run")
                .default_value(DEFAULT_TARGET),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to brisk.yml build file"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("diagnostic")
                .long("diagnostic")
                .help("Print diagnostic output, including internal tracing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("List the tasks that would run without running them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclusive")
                .short('e')
                .long("exclusive")
                .help("Run the target without its dependencies")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List the tasks of the build file")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["tree", "dry-run"]),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .help("Print the execution order for the target")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("var")
                .long("var")
                .value_name("KEY=VALUE")
                .help("Set a variable (repeatable)")
                .value_parser(parse_var)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print shell completions")
                .value_parser(value_parser!(Shell)),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("diagnostic") {
        Verbosity::Diagnostic
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Parse a `KEY=VALUE` pair
fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid variable '{}', expected KEY=VALUE", s)),
    }
}

fn print_tasks(engine: &Engine, config: &Config) {
    if let Some(usage) = &config.usage {
        println!("{}", usage);
        println!();
    }

    let width = engine.tasks().iter().map(|t| t.name().len()).max().unwrap_or(0);
    for task in engine.tasks() {
        let name = format!("{:<width$}", task.name(), width = width);
        println!("  {}  {}", name.bold(), task.description().unwrap_or_default());

        let deps: Vec<&str> = task.dependencies().iter().map(|d| d.name.as_str()).collect();
        if !deps.is_empty() {
            println!(
                "  {:<width$}  {} {}",
                "",
                "depends on:".dimmed(),
                deps.join(", "),
                width = width
            );
        }
    }
}

/// Set up tracing for internal diagnostics; `RUST_LOG` wins over the verbosity flags
fn init_tracing(verbosity: Verbosity) {
    let default = if verbosity >= Verbosity::Diagnostic {
        "brisk=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr)
                .with_filter(filter),
        )
        .try_init();
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<()> {
    run_from(std::env::args_os())
}

/// Run the CLI application with provided arguments
pub fn run_from<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = build_command();
    let matches = command.clone().get_matches_from(args);

    if let Some(shell) = matches.get_one::<Shell>("completions") {
        clap_complete::generate(*shell, &mut command, "brisk", &mut io::stdout());
        return Ok(());
    }

    init_tracing(get_verbosity(&matches));

    let app = match matches.get_one::<PathBuf>("file") {
        Some(path) => App::with_config_file(path.clone())?,
        None => App::new()?,
    };

    app.run(&matches)
}
