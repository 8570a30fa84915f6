// src/engine/mod.rs

//! Watch loop controller.
//!
//! This module sequences runs of the entry file in response to:
//! - the initial start
//! - file-watch changes (debounced)
//! - run completion
//! - shutdown requests
//!
//! The pure state machine lives in [`core`]; the async/IO shell that owns
//! the timer, the in-flight run and the notifier is in [`runtime`].

use std::path::PathBuf;
use std::time::Duration;

use globset::GlobSet;

use crate::types::ChangeKind;

/// Sequence number of a run, starting at 1 for the initial run.
pub type RunId = u64;

/// Default quiet period between the last change and the restart.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Named controller phases.
///
/// `Running` and `RunningRestartOwed` both have exactly one run in flight;
/// the latter additionally owes one restart once that run settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    Running,
    RunningRestartOwed,
    Closing,
    Closed,
}

/// How a run settled, as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { dependency_files: Vec<PathBuf> },
    Failed { error: String },
}

/// Options used by the controller core.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// File to execute; resolved against `base_dir` if relative.
    pub entry: PathBuf,
    /// Directory relative dependency paths are resolved against.
    pub base_dir: PathBuf,
    /// Quiet period after the last change before a restart.
    pub debounce: Duration,
    /// Dependency paths matching these globs are not watched.
    pub exclude: GlobSet,
    /// Abort watch mode if the very first run fails.
    pub fatal_initial_failure: bool,
}

impl ControllerOptions {
    pub fn new(entry: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            base_dir: base_dir.into(),
            debounce: DEFAULT_DEBOUNCE,
            exclude: GlobSet::empty(),
            fatal_initial_failure: false,
        }
    }
}

/// Events flowing into the controller core. Exactly one is handled at a time.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Begin watching and perform the initial run.
    Started,
    /// The notifier saw a change to a watched path.
    FileChanged { kind: ChangeKind, path: PathBuf },
    /// The debounce timer armed with `generation` expired.
    DebounceElapsed { generation: u64 },
    /// The run `run_id` finished.
    RunSettled {
        run_id: RunId,
        outcome: RunOutcome,
        elapsed: Duration,
    },
    /// The notifier reported an error.
    WatcherFailed { message: String },
    /// Stop: termination signal or explicit shutdown.
    ShutdownRequested,
    /// The notifier finished closing.
    WatcherClosed,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod watch_set;

pub use core::ControllerCore;
pub use event_handlers::{ControllerCommand, CoreStep};
pub use runtime::{Controller, ShutdownHandle};
pub use watch_set::{WatchDelta, WatchSet};
