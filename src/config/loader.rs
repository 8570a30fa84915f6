// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path without validating it.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the checked `ConfigFile`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw = load_from_path(&path)?;
    ConfigFile::try_from(raw)
}

/// Resolve the configuration to use.
///
/// - An explicit path must exist.
/// - Otherwise `Rono.toml` in the working directory is used if present.
/// - Otherwise defaults apply.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        debug!(path = ?default_path, "using config file from working directory");
        return load_and_validate(default_path);
    }

    debug!("no config file found; using defaults");
    Ok(ConfigFile::default())
}

/// Default config file location: `Rono.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Rono.toml")
}
