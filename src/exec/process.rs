// src/exec/process.rs

//! Executes the entry file with an external runtime program.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RunSection;
use crate::exec::backend::{RunError, RunExecutor, RunOutput, RunRequest};
use crate::exec::scanner::DependencyScanner;
use crate::fs::RealFileSystem;

/// Runs `<runtime> [runtime_args...] <entry> [args...]`.
///
/// Dependencies are scanned before the process starts, so a broken import
/// fails the run without executing anything. The child inherits stdio; what
/// the script prints is its own business.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    runtime: String,
    runtime_args: Vec<String>,
    scanner: DependencyScanner,
}

impl ProcessExecutor {
    pub fn new(runtime: impl Into<String>, runtime_args: Vec<String>, scanner: DependencyScanner) -> Self {
        Self {
            runtime: runtime.into(),
            runtime_args,
            scanner,
        }
    }

    pub fn from_config(run: &RunSection) -> anyhow::Result<Self> {
        let scanner = DependencyScanner::new(Arc::new(RealFileSystem), run.extensions.clone())?;
        Ok(Self::new(run.runtime.clone(), run.runtime_args.clone(), scanner))
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    fn command(&self, request: &RunRequest) -> Command {
        let mut cmd = Command::new(&self.runtime);
        cmd.args(&self.runtime_args)
            .arg(&request.entry)
            .args(&request.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

impl RunExecutor for ProcessExecutor {
    fn execute(
        &self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput, RunError>> + Send + '_>> {
        Box::pin(async move {
            let scanner = self.scanner.clone();
            let entry = request.entry.clone();
            let dependency_files = tokio::task::spawn_blocking(move || scanner.scan(&entry))
                .await
                .map_err(|e| RunError::Aborted(e.to_string()))??;

            debug!(
                entry = ?request.entry,
                dependencies = dependency_files.len(),
                "dependencies resolved"
            );

            info!(
                runtime = %self.runtime,
                entry = ?request.entry,
                args = ?request.args,
                "starting entry process"
            );

            let status = self
                .command(&request)
                .status()
                .await
                .map_err(|source| RunError::Spawn {
                    program: self.runtime.clone(),
                    source,
                })?;

            info!(
                entry = ?request.entry,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "entry process exited"
            );

            if !status.success() {
                return Err(RunError::Exited {
                    entry: request.entry,
                    code: status.code(),
                });
            }

            Ok(RunOutput { dependency_files })
        })
    }
}
