// src/config/validate.rs

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{ConfigFile, RawConfigFile, RunSection, WatchSection};
use crate::errors::{Result, RonoError};

/// Longest accepted quiet period.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RonoError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_sections(&raw.run, &raw.watch)?;
        Ok(ConfigFile::new_unchecked(raw.run, raw.watch))
    }
}

/// Check a validated config again (e.g. after CLI overrides were applied).
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_sections(&cfg.run, &cfg.watch)
}

fn validate_sections(run: &RunSection, watch: &WatchSection) -> Result<()> {
    validate_run_section(run)?;
    validate_watch_section(watch)?;
    Ok(())
}

fn validate_run_section(run: &RunSection) -> Result<()> {
    if run.runtime.trim().is_empty() {
        return Err(RonoError::ConfigError(
            "[run].runtime must not be empty".to_string(),
        ));
    }

    if run.extensions.is_empty() {
        return Err(RonoError::ConfigError(
            "[run].extensions must list at least one extension".to_string(),
        ));
    }

    for ext in &run.extensions {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(RonoError::ConfigError(format!(
                "[run].extensions entries must be non-empty and written without a leading dot (got {ext:?})"
            )));
        }
    }

    Ok(())
}

fn validate_watch_section(watch: &WatchSection) -> Result<()> {
    if watch.debounce_ms == 0 || watch.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(RonoError::ConfigError(format!(
            "[watch].debounce_ms must be between 1 and {MAX_DEBOUNCE_MS} (got {})",
            watch.debounce_ms
        )));
    }

    build_exclude_set(&watch.exclude)?;
    Ok(())
}

/// Compile `exclude` patterns into a matcher.
pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
