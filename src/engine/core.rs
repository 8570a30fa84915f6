// src/engine/core.rs

//! Pure controller state machine.
//!
//! [`ControllerCore`] consumes [`ControllerEvent`]s one at a time and
//! produces a [`CoreStep`]: the commands the IO shell should carry out and
//! whether the loop keeps going.
//!
//! It has no channels, no Tokio types, and performs no IO, so the
//! single-flight and coalescing rules can be tested by feeding it events.

use std::path::Path;

use crate::engine::event_handlers::CoreStep;
use crate::engine::watch_set::WatchSet;
use crate::engine::{ControllerEvent, ControllerOptions, Phase, RunId};

/// Internal state; see [`Phase`] for the public view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    /// Not started yet, or nothing to do.
    Idle,
    /// A restart is owed and the quiet-period timer `generation` is armed.
    Debouncing { generation: u64 },
    /// Run `run_id` is in flight.
    Running { run_id: RunId, restart_owed: bool },
    /// Shutting down. `awaiting_run` is the run we still wait for; once it
    /// is `None` the notifier close has been requested.
    Closing { awaiting_run: Option<RunId> },
    Closed,
}

#[derive(Debug)]
pub struct ControllerCore {
    pub(super) options: ControllerOptions,
    pub(super) state: State,
    pub(super) watch_set: WatchSet,
    pub(super) started: bool,
    pub(super) last_run_id: RunId,
    pub(super) last_generation: u64,
    pub(super) fatal_error: Option<String>,
}

impl ControllerCore {
    pub fn new(options: ControllerOptions) -> Self {
        let watch_set = WatchSet::new(&options.entry, &options.base_dir, options.exclude.clone());
        Self {
            options,
            state: State::Idle,
            watch_set,
            started: false,
            last_run_id: 0,
            last_generation: 0,
            fatal_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Debouncing { .. } => Phase::Debouncing,
            State::Running {
                restart_owed: false,
                ..
            } => Phase::Running,
            State::Running {
                restart_owed: true,
                ..
            } => Phase::RunningRestartOwed,
            State::Closing { .. } => Phase::Closing,
            State::Closed => Phase::Closed,
        }
    }

    /// The absolute entry path (always watched).
    pub fn entry(&self) -> &Path {
        self.watch_set.entry()
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// Run currently in flight, if any (including one awaited by shutdown).
    pub fn in_flight(&self) -> Option<RunId> {
        match self.state {
            State::Running { run_id, .. } => Some(run_id),
            State::Closing {
                awaiting_run: Some(run_id),
            } => Some(run_id),
            _ => None,
        }
    }

    /// Number of runs started so far.
    pub fn runs_started(&self) -> u64 {
        self.last_run_id
    }

    pub fn is_accepting_changes(&self) -> bool {
        !matches!(self.state, State::Closing { .. } | State::Closed)
    }

    /// The error that made the initial run fatal, if that happened.
    pub fn take_fatal_error(&mut self) -> Option<String> {
        self.fatal_error.take()
    }

    /// Handle a single event, updating state and returning commands for the
    /// IO shell.
    pub fn step(&mut self, event: ControllerEvent) -> CoreStep {
        match event {
            ControllerEvent::Started => self.handle_started(),
            ControllerEvent::FileChanged { kind, path } => self.handle_file_changed(kind, path),
            ControllerEvent::DebounceElapsed { generation } => {
                self.handle_debounce_elapsed(generation)
            }
            ControllerEvent::RunSettled {
                run_id,
                outcome,
                elapsed,
            } => self.handle_run_settled(run_id, outcome, elapsed),
            ControllerEvent::WatcherFailed { message } => self.handle_watcher_failed(message),
            ControllerEvent::ShutdownRequested => self.handle_shutdown_requested(),
            ControllerEvent::WatcherClosed => self.handle_watcher_closed(),
        }
    }
}
