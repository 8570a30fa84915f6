// src/config/mod.rs

//! Configuration loading and validation for rono.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate values and compile glob patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, resolve_config};
pub use model::{ConfigFile, RawConfigFile, RunSection, WatchSection};
pub use validate::{build_exclude_set, validate_config};
