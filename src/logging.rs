// src/logging.rs

//! Diagnostics for `rono` via `tracing` + `tracing-subscriber`.
//!
//! Filter selection, first match wins:
//! 1. `--log-level` on the command line
//! 2. `RONO_LOG`: either a bare level ("debug") or full `EnvFilter`
//!    directives ("rono::engine=debug,notify=warn")
//! 3. `warn`
//!
//! Everything goes to stderr. Stdout belongs to the executed script and the
//! `[rono]` progress lines.

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "RONO_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());

    let (filter, rejected) = match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new(DEFAULT_DIRECTIVES), Some(err)),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if let Some(err) = rejected {
        warn!(%directives, error = %err, "ignoring invalid {LOG_ENV}");
    }
    Ok(())
}

/// The filter directives to use for the given CLI flag and `RONO_LOG` value.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }

    match env.map(str::trim) {
        Some(value) if !value.is_empty() => match parse_level_str(value) {
            Some(level) => level.to_string().to_lowercase(),
            None => value.to_string(),
        },
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
