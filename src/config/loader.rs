// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{HeteroflowConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// the checked config.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<HeteroflowConfig> {
    let raw_config = load_from_path(&path)?;
    let config = HeteroflowConfig::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate configuration held in memory.
pub fn from_toml_str(contents: &str) -> Result<HeteroflowConfig> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    HeteroflowConfig::try_from(raw)
}

/// `Heteroflow.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Heteroflow.toml")
}
