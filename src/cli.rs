// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Shape: `rono [watch|--watch|-w] [options] <entry-file> [...args]`.
//! Everything from the entry file onward belongs to the executed script,
//! except `--watch`/`-w`, which enable watch mode wherever they appear.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub const USAGE: &str = "rono [watch|--watch|-w] <entry-file> [...args]";

/// Command-line arguments for `rono`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rono",
    version,
    about = "Run a script file, optionally re-running it when its dependencies change.",
    override_usage = USAGE,
    long_about = None
)]
pub struct CliArgs {
    /// Keep running and re-execute the entry whenever a dependency changes.
    #[arg(short, long)]
    pub watch: bool,

    /// Path to a config file (TOML).
    ///
    /// Default: `Rono.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RONO_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Quiet period in milliseconds before re-running (overrides config).
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Program used to execute the entry (overrides config).
    #[arg(long, value_name = "PROGRAM")]
    pub runtime: Option<String>,

    /// Entry file followed by the arguments passed to it.
    #[arg(
        value_name = "ENTRY",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..
    )]
    pub command: Vec<String>,
}

impl CliArgs {
    /// The entry file, if one was given.
    pub fn entry(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments for the executed script.
    pub fn script_args(&self) -> Vec<String> {
        self.command.iter().skip(1).cloned().collect()
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around parsing the process arguments.
pub fn parse() -> CliArgs {
    parse_from(std::env::args_os())
}

/// Parse arguments (including the program name), accepting a leading bare
/// `watch` word as an alias for `--watch`.
pub fn parse_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    CliArgs::parse_from(normalize_args(args))
}

/// Fallible variant of [`parse_from`], for callers that handle errors.
pub fn try_parse_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    CliArgs::try_parse_from(normalize_args(args))
}

/// `--watch`/`-w` are honoured at any position and never reach the script; a
/// bare `watch` only counts as the first argument.
fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut watch = false;
    let mut normalized = Vec::new();

    for (index, arg) in args.into_iter().map(Into::into).enumerate() {
        let is_flag = index > 0 && (arg == "--watch" || arg == "-w");
        if is_flag || (index == 1 && arg == "watch") {
            watch = true;
            continue;
        }
        normalized.push(arg);
    }

    if watch {
        let at = normalized.len().min(1);
        normalized.insert(at, OsString::from("--watch"));
    }
    normalized
}
