// src/exec/backend.rs

//! Pluggable run executor abstraction.
//!
//! The controller talks to a `RunExecutor` instead of spawning processes
//! itself. Production code uses [`ProcessExecutor`](super::ProcessExecutor);
//! tests provide executors that script outcomes and record calls.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Absolute path of the entry file.
    pub entry: PathBuf,
    /// Arguments passed through to the executed script.
    pub args: Vec<String>,
}

impl RunRequest {
    pub fn new(entry: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            entry: entry.into(),
            args,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Every file whose content influenced what was executed, entry included.
    pub dependency_files: Vec<PathBuf>,
}

/// Why a run failed.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("entry file not found: {0:?}")]
    EntryNotFound(PathBuf),

    #[error("could not resolve import '{specifier}' from {importer:?}")]
    UnresolvedImport { specifier: String, importer: PathBuf },

    #[error("failed to scan dependencies: {0:#}")]
    Scan(anyhow::Error),

    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{entry:?} exited with {}", exit_description(*.code))]
    Exited { entry: PathBuf, code: Option<i32> },

    #[error("run task aborted: {0}")]
    Aborted(String),
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Trait abstracting how the entry file is executed.
///
/// Implementations must tolerate being called repeatedly. The controller
/// never has more than one call outstanding.
pub trait RunExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput, RunError>> + Send + '_>>;
}
