// src/engine/event_handlers.rs

//! Transition logic for the controller core.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::core::{ControllerCore, State};
use crate::engine::{RunId, RunOutcome};
use crate::report::Report;
use crate::types::ChangeKind;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Execute the entry file; the result comes back as `RunSettled`.
    StartRun { run_id: RunId },
    /// Replace any pending debounce timer with one firing after `delay`.
    ArmDebounce { generation: u64, delay: Duration },
    /// Drop the pending debounce timer, if any.
    CancelDebounce,
    /// Subscribe the notifier to these paths.
    Watch(Vec<PathBuf>),
    /// Unsubscribe the notifier from these paths.
    Unwatch(Vec<PathBuf>),
    /// Tell the user something.
    Report(Report),
    /// Close the notifier; completion comes back as `WatcherClosed`.
    CloseWatcher,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    pub commands: Vec<ControllerCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn new(commands: Vec<ControllerCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn nothing() -> Self {
        Self::new(Vec::new())
    }
}

impl ControllerCore {
    pub(super) fn handle_started(&mut self) -> CoreStep {
        if self.started {
            warn!("controller already started; ignoring duplicate start");
            return CoreStep::nothing();
        }
        self.started = true;

        let mut commands = vec![ControllerCommand::Watch(vec![
            self.watch_set.entry().to_path_buf(),
        ])];
        commands.push(self.start_run());
        CoreStep::new(commands)
    }

    /// A watched path changed.
    ///
    /// - Idle / Debouncing: (re)arm the quiet-period timer.
    /// - Running: remember that one restart is owed; further changes
    ///   coalesce into that same restart.
    /// - Closing / Closed: ignored.
    pub(super) fn handle_file_changed(&mut self, kind: ChangeKind, path: PathBuf) -> CoreStep {
        if !self.is_accepting_changes() {
            debug!(%kind, ?path, "change ignored while shutting down");
            return CoreStep::nothing();
        }

        debug!(%kind, ?path, "watched path changed");
        let mut commands = vec![ControllerCommand::Report(Report::Changed { kind, path })];
        commands.extend(self.schedule_restart());
        CoreStep::new(commands)
    }

    pub(super) fn handle_debounce_elapsed(&mut self, generation: u64) -> CoreStep {
        match self.state {
            State::Debouncing { generation: armed } if armed == generation => {
                CoreStep::new(vec![self.start_run()])
            }
            _ => {
                debug!(generation, state = ?self.state, "stale debounce expiry ignored");
                CoreStep::nothing()
            }
        }
    }

    pub(super) fn handle_run_settled(
        &mut self,
        run_id: RunId,
        outcome: RunOutcome,
        elapsed: Duration,
    ) -> CoreStep {
        match self.state {
            State::Running {
                run_id: current,
                restart_owed,
            } if current == run_id => {
                CoreStep::new(self.settle_run(run_id, outcome, elapsed, restart_owed))
            }
            State::Closing {
                awaiting_run: Some(current),
            } if current == run_id => {
                // Whatever the last run did no longer matters.
                if let RunOutcome::Failed { error } = &outcome {
                    debug!(run_id, %error, "discarding run failure during shutdown");
                }
                self.state = State::Closing { awaiting_run: None };
                CoreStep::new(vec![ControllerCommand::CloseWatcher])
            }
            _ => {
                warn!(run_id, state = ?self.state, "settlement for unknown run ignored");
                CoreStep::nothing()
            }
        }
    }

    pub(super) fn handle_watcher_failed(&mut self, message: String) -> CoreStep {
        if !self.is_accepting_changes() {
            return CoreStep::nothing();
        }
        warn!(%message, "file watcher error");
        CoreStep::new(vec![ControllerCommand::Report(Report::WatcherError {
            message,
        })])
    }

    pub(super) fn handle_shutdown_requested(&mut self) -> CoreStep {
        if !self.is_accepting_changes() {
            debug!("shutdown already in progress");
            return CoreStep::nothing();
        }
        info!("shutdown requested");
        CoreStep::new(self.begin_close())
    }

    pub(super) fn handle_watcher_closed(&mut self) -> CoreStep {
        match self.state {
            State::Closing { awaiting_run: None } => {
                info!("controller closed");
                self.state = State::Closed;
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
            _ => {
                warn!(state = ?self.state, "unexpected watcher close ignored");
                CoreStep::nothing()
            }
        }
    }

    fn settle_run(
        &mut self,
        run_id: RunId,
        outcome: RunOutcome,
        elapsed: Duration,
        restart_owed: bool,
    ) -> Vec<ControllerCommand> {
        let mut commands = Vec::new();

        match outcome {
            RunOutcome::Succeeded { dependency_files } => {
                let delta = self.watch_set.reconcile(dependency_files);
                if !delta.to_add.is_empty() {
                    commands.push(ControllerCommand::Watch(delta.to_add));
                }
                if !delta.to_remove.is_empty() {
                    commands.push(ControllerCommand::Unwatch(delta.to_remove));
                }
                info!(run_id, elapsed_ms = elapsed.as_millis() as u64, "run succeeded");
                commands.push(ControllerCommand::Report(Report::RunCompleted {
                    entry: self.watch_set.entry().to_path_buf(),
                    elapsed,
                }));
            }
            RunOutcome::Failed { error } => {
                warn!(run_id, "run failed; watch set unchanged");
                commands.push(ControllerCommand::Report(Report::RunFailed {
                    error: error.clone(),
                }));

                if run_id == 1 && self.options.fatal_initial_failure {
                    self.fatal_error = Some(error);
                    self.state = State::Idle;
                    commands.extend(self.begin_close());
                    return commands;
                }
            }
        }

        self.state = State::Idle;
        // The initial run always announces watch mode, even with a restart owed.
        if run_id == 1 || !restart_owed {
            commands.push(ControllerCommand::Report(Report::Watching));
        }
        if restart_owed {
            // Changes seen mid-run still go through the full quiet period.
            commands.extend(self.schedule_restart());
        }
        commands
    }
}

impl ControllerCore {
    fn start_run(&mut self) -> ControllerCommand {
        self.last_run_id += 1;
        let run_id = self.last_run_id;
        self.state = State::Running {
            run_id,
            restart_owed: false,
        };
        debug!(run_id, "starting run");
        ControllerCommand::StartRun { run_id }
    }

    fn schedule_restart(&mut self) -> Vec<ControllerCommand> {
        match self.state {
            State::Idle | State::Debouncing { .. } => {
                self.last_generation += 1;
                let generation = self.last_generation;
                self.state = State::Debouncing { generation };
                vec![ControllerCommand::ArmDebounce {
                    generation,
                    delay: self.options.debounce,
                }]
            }
            State::Running { run_id, .. } => {
                self.state = State::Running {
                    run_id,
                    restart_owed: true,
                };
                Vec::new()
            }
            State::Closing { .. } | State::Closed => Vec::new(),
        }
    }

    fn begin_close(&mut self) -> Vec<ControllerCommand> {
        let mut commands = vec![ControllerCommand::CancelDebounce];
        match self.state {
            State::Running { run_id, .. } => {
                debug!(run_id, "waiting for in-flight run before closing");
                self.state = State::Closing {
                    awaiting_run: Some(run_id),
                };
            }
            _ => {
                self.state = State::Closing { awaiting_run: None };
                commands.push(ControllerCommand::CloseWatcher);
            }
        }
        commands
    }
}
