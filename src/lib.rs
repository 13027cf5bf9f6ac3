//! Brisk - a task graph build engine
//!
//! Tasks are registered with an [`Engine`](runner::Engine) together with their
//! dependencies, criteria, actions and error handlers. Running a target
//! computes its dependency order, executes each task once and returns an
//! [`ExecutionReport`](runner::ExecutionReport). Build files (`brisk.yml`)
//! map onto the same API through [`config::register_config`].

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{BriskError, Result, RunFailure};
pub use runner::{Context, Engine, ExecutionReport, TaskBuilder};

/// Current version of Brisk
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
