// src/report.rs

//! User-facing progress output.
//!
//! These are the `[rono] ...` lines a user sees while working. They go
//! through a [`Reporter`] so the controller stays testable; diagnostics for
//! developers go through `tracing` (stderr) instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::ChangeKind;
use crate::watch::path_utils::display_path;

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// A run finished successfully.
    RunCompleted { entry: PathBuf, elapsed: Duration },
    /// A run failed; `error` carries the full cause chain.
    RunFailed { error: String },
    /// A watched path changed.
    Changed { kind: ChangeKind, path: PathBuf },
    /// The controller is idle and waiting for changes.
    Watching,
    /// The file watcher reported a problem.
    WatcherError { message: String },
}

/// Output sink for [`Report`]s.
pub trait Reporter: Send {
    fn report(&mut self, report: &Report);
}

/// Prints reports to stdout (progress) and stderr (errors).
///
/// Paths are printed relative to `root` when possible.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    root: PathBuf,
}

impl ConsoleReporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn format(&self, report: &Report) -> String {
        format_report(&self.root, report)
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, report: &Report) {
        let line = self.format(report);
        match report {
            Report::RunFailed { .. } | Report::WatcherError { .. } => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
}

/// Render a report as a single `[rono]` line (errors may span several lines).
pub fn format_report(root: &Path, report: &Report) -> String {
    match report {
        Report::RunCompleted { entry, elapsed } => format!(
            "[rono] Ran {} in {}ms",
            display_path(root, entry),
            elapsed.as_millis()
        ),
        Report::RunFailed { error } => format!("[rono] {error}"),
        Report::Changed { kind, path } => {
            format!("[rono] {kind} {}", display_path(root, path))
        }
        Report::Watching => "[rono] Watching for changes...".to_string(),
        Report::WatcherError { message } => format!("[rono] watcher error: {message}"),
    }
}
