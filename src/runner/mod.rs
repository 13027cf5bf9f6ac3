//! Task execution engine
//!
//! This module holds the task model, the graph and its traversal, the
//! execution strategies and the engine that ties them together, plus the
//! shell command support used by build files.

pub mod builder;
pub mod command;
pub mod context;
pub mod engine;
pub mod graph;
pub mod hooks;
pub mod interpolate;
pub mod log;
pub mod report;
pub mod strategy;
pub mod task;
pub mod when;

// Re-export main types
pub use builder::{TaskBuilder, TypedTaskBuilder};
pub use command::*;
pub use context::*;
pub use engine::{Engine, RunSettings, DELEGATED_TO_ERROR_HANDLER};
pub use graph::TaskGraph;
pub use hooks::*;
pub use interpolate::*;
pub use log::{CollectingLog, Log, LogLevel, TracingLog};
pub use report::*;
pub use strategy::{DefaultExecutionStrategy, DryRunExecutionStrategy, ExecutionStrategy};
pub use task::{Criteria, Dependency, Task, TaskInfo};
pub use when::*;
