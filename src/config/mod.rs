//! Build file configuration
//!
//! This module handles discovery, parsing and validation of brisk.yml files
//! and their registration with the engine.

pub mod parse;
pub mod register;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use register::{configure_context, register_config};
pub use schema::*;
pub use types::*;
