//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, shell completion and the
//! console output of a run.

pub mod app;

// Re-export main types
pub use app::*;
