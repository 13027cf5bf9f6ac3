//! Build file parsing and discovery

use crate::config::schema::validate_config;
use crate::config::types::Config;
use crate::error::{BriskError, ConfigError, ConfigResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Build file names to search for, in order of preference
pub const CONFIG_FILE_NAMES: &[&str] = &["brisk.yml", "brisk.yaml"];

/// Find the build file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the build file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut searched_paths = Vec::new();

    for dir in start_dir.ancestors() {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = dir.join(file_name);
            if config_path.is_file() {
                return Ok(config_path);
            }
            searched_paths.push(config_path.display().to_string());
        }
    }

    Err(ConfigError::NotFound(searched_paths.join(", ")))
}

/// Parse and validate a build file
pub fn parse_config_file(path: &Path) -> Result<Config, BriskError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse and validate a build file from a string
pub fn parse_config(yaml: &str) -> Result<Config, BriskError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse the build file with automatic discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), BriskError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}
