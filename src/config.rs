//! Configuration handling for Stencil runs.
//! An optional stencil.json / stencil.yml / stencil.yaml in the working
//! directory supplies extra bindings and dependencies.

use crate::constants::CONFIG_FILES;
use crate::error::{StencilError, StencilResult};
use crate::vars::Vars;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bindings added to the context before the scaffold runs
    pub vars: IndexMap<String, serde_json::Value>,
    /// Dependencies added to the generated project
    pub dependencies: Vec<String>,
}

impl Config {
    pub fn vars(&self) -> Vars {
        Vars::from(self.vars.clone())
    }
}

/// Loads the first configuration file found in `dir`.
///
/// # Arguments
/// * `dir` - Directory searched for the configuration
/// * `config_files` - File names to try, in order
///
/// # Returns
/// * `StencilResult<Option<String>>` - Contents of the first file found, if any
pub fn load_config<P: AsRef<Path>>(dir: P, config_files: &[&str]) -> StencilResult<Option<String>> {
    for file in config_files {
        let config_path = dir.as_ref().join(file);
        if config_path.exists() {
            debug!("Loading configuration from {}", config_path.display());
            return Ok(Some(std::fs::read_to_string(&config_path)?));
        }
    }
    debug!("No configuration file found (tried: {})", config_files.join(", "));
    Ok(None)
}

/// Parses configuration content, trying JSON first and YAML second.
///
/// # Errors
/// * `StencilError::ConfigError` if the content is neither valid JSON nor YAML
pub fn parse_config(content: &str) -> StencilResult<Config> {
    match serde_json::from_str(content) {
        Ok(config) => Ok(config),
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| StencilError::ConfigError(format!("Invalid configuration format: {}", e))),
    }
}

/// Loads and parses the configuration of `dir`; a missing file yields the
/// default configuration.
pub fn get_config<P: AsRef<Path>>(dir: P) -> StencilResult<Config> {
    match load_config(dir, &CONFIG_FILES)? {
        Some(content) => parse_config(&content),
        None => Ok(Config::default()),
    }
}
