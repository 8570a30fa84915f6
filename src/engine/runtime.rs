// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, RonoError};
use crate::exec::{RunError, RunExecutor, RunOutput, RunRequest};
use crate::report::{Report, Reporter};
use crate::watch::{ChangeNotifier, WatcherEvent};

use super::core::ControllerCore;
use super::{ControllerCommand, ControllerEvent, RunId, RunOutcome};

type RunResult = std::result::Result<RunOutput, RunError>;

/// The one run allowed to be in flight.
struct InFlightRun {
    run_id: RunId,
    started: Instant,
    handle: JoinHandle<RunResult>,
}

struct PendingDebounce {
    generation: u64,
    deadline: Instant,
}

/// What woke the event loop up.
enum Wakeup {
    Shutdown,
    Settled {
        run_id: RunId,
        started: Instant,
        result: RunResult,
    },
    DebounceExpired,
    Watcher(WatcherEvent),
    WatcherGone,
}

/// Drives a [`ControllerCore`] from real event sources and carries out its
/// commands.
///
/// This is the IO shell: it owns the notifier, the debounce deadline and
/// the in-flight run handle. Every decision is made by the core.
pub struct Controller<E: RunExecutor, N: ChangeNotifier> {
    core: ControllerCore,
    executor: Arc<E>,
    notifier: N,
    events: mpsc::UnboundedReceiver<WatcherEvent>,
    events_open: bool,
    reporter: Box<dyn Reporter>,
    request: RunRequest,
    debounce: Option<PendingDebounce>,
    in_flight: Option<InFlightRun>,
    closed: CancellationToken,
}

impl<E: RunExecutor, N: ChangeNotifier> fmt::Debug for Controller<E, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("core", &self.core)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<E: RunExecutor, N: ChangeNotifier> Controller<E, N> {
    /// `args` are passed to the executed script on every run; the entry
    /// comes from the core.
    pub fn new(
        core: ControllerCore,
        executor: E,
        notifier: N,
        events: mpsc::UnboundedReceiver<WatcherEvent>,
        reporter: Box<dyn Reporter>,
        args: Vec<String>,
    ) -> Self {
        let request = RunRequest::new(core.entry(), args);
        Self {
            core,
            executor: Arc::new(executor),
            notifier,
            events,
            events_open: true,
            reporter,
            request,
            debounce: None,
            in_flight: None,
            closed: CancellationToken::new(),
        }
    }

    /// Handle that can request shutdown and wait for it to complete.
    pub fn shutdown_handle(&self, shutdown: &CancellationToken) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: shutdown.clone(),
            closed: self.closed.clone(),
        }
    }

    /// Main event loop.
    ///
    /// Performs the initial run, then reacts to changes until `shutdown` is
    /// cancelled and every resource is released. Returns an error only when
    /// the initial run failed and that is configured to be fatal.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        // Fires `closed` on every way out of this function.
        let _closed = self.closed.clone().drop_guard();

        info!(entry = ?self.request.entry, "controller started");

        let mut pending: VecDeque<ControllerEvent> = VecDeque::from([ControllerEvent::Started]);
        let mut shutdown_seen = false;

        loop {
            let event = match pending.pop_front() {
                Some(event) => event,
                None => {
                    let wakeup = self.next_wakeup(&shutdown, shutdown_seen).await;
                    match self.translate(wakeup) {
                        Some(event) => {
                            if matches!(event, ControllerEvent::ShutdownRequested) {
                                shutdown_seen = true;
                            }
                            event
                        }
                        None => continue,
                    }
                }
            };

            debug!(?event, "controller received event");
            let step = self.core.step(event);

            for command in step.commands {
                if let Some(follow_up) = self.execute_command(command).await {
                    pending.push_back(follow_up);
                }
            }

            if !step.keep_running {
                break;
            }
        }

        info!("controller exiting");
        match self.core.take_fatal_error() {
            Some(error) => Err(RonoError::InitialRunFailed(error)),
            None => Ok(()),
        }
    }

    async fn next_wakeup(&mut self, shutdown: &CancellationToken, shutdown_seen: bool) -> Wakeup {
        let deadline = self.debounce.as_ref().map(|d| d.deadline);

        tokio::select! {
            biased;

            _ = shutdown.cancelled(), if !shutdown_seen => Wakeup::Shutdown,

            (run_id, started, result) = settle(&mut self.in_flight) => {
                Wakeup::Settled { run_id, started, result }
            }

            _ = expire(deadline) => Wakeup::DebounceExpired,

            event = self.events.recv(), if self.events_open => match event {
                Some(event) => Wakeup::Watcher(event),
                None => Wakeup::WatcherGone,
            },
        }
    }

    fn translate(&mut self, wakeup: Wakeup) -> Option<ControllerEvent> {
        match wakeup {
            Wakeup::Shutdown => Some(ControllerEvent::ShutdownRequested),
            Wakeup::Settled {
                run_id,
                started,
                result,
            } => {
                self.in_flight = None;
                let outcome = match result {
                    Ok(output) => RunOutcome::Succeeded {
                        dependency_files: output.dependency_files,
                    },
                    Err(err) => RunOutcome::Failed {
                        error: format!("{:?}", anyhow::Error::new(err)),
                    },
                };
                Some(ControllerEvent::RunSettled {
                    run_id,
                    outcome,
                    elapsed: started.elapsed(),
                })
            }
            Wakeup::DebounceExpired => self
                .debounce
                .take()
                .map(|d| ControllerEvent::DebounceElapsed {
                    generation: d.generation,
                }),
            Wakeup::Watcher(WatcherEvent::Changed { kind, path }) => {
                Some(ControllerEvent::FileChanged { kind, path })
            }
            Wakeup::Watcher(WatcherEvent::Error(message)) => {
                Some(ControllerEvent::WatcherFailed { message })
            }
            Wakeup::WatcherGone => {
                warn!("watcher event channel closed; no further changes will be seen");
                self.events_open = false;
                None
            }
        }
    }

    /// Execute a single command from the core. Some commands complete with
    /// an event that must be fed back before anything else.
    async fn execute_command(&mut self, command: ControllerCommand) -> Option<ControllerEvent> {
        match command {
            ControllerCommand::StartRun { run_id } => {
                self.start_run(run_id);
                None
            }
            ControllerCommand::ArmDebounce { generation, delay } => {
                self.debounce = Some(PendingDebounce {
                    generation,
                    deadline: Instant::now() + delay,
                });
                None
            }
            ControllerCommand::CancelDebounce => {
                self.debounce = None;
                None
            }
            ControllerCommand::Watch(paths) => {
                debug!(?paths, "watching paths");
                if let Err(err) = self.notifier.watch(&paths) {
                    self.report_watcher_error(err);
                }
                None
            }
            ControllerCommand::Unwatch(paths) => {
                debug!(?paths, "unwatching paths");
                if let Err(err) = self.notifier.unwatch(&paths) {
                    self.report_watcher_error(err);
                }
                None
            }
            ControllerCommand::Report(report) => {
                self.reporter.report(&report);
                None
            }
            ControllerCommand::CloseWatcher => {
                if let Err(err) = self.notifier.close().await {
                    warn!(error = %err, "error while closing file watcher");
                }
                self.events_open = false;
                Some(ControllerEvent::WatcherClosed)
            }
        }
    }

    fn start_run(&mut self, run_id: RunId) {
        if let Some(existing) = &self.in_flight {
            // The core never asks for this; refuse rather than run twice.
            error!(
                run_id,
                in_flight = existing.run_id,
                "refusing to start a run while another is in flight"
            );
            return;
        }

        debug!(run_id, entry = ?self.request.entry, "dispatching run");
        let executor = Arc::clone(&self.executor);
        let request = self.request.clone();
        let handle = tokio::spawn(async move { executor.execute(request).await });

        self.in_flight = Some(InFlightRun {
            run_id,
            started: Instant::now(),
            handle,
        });
    }

    fn report_watcher_error(&mut self, err: RonoError) {
        warn!(error = %err, "file watcher subscription failed");
        self.reporter.report(&Report::WatcherError {
            message: err.to_string(),
        });
    }
}

/// Resolves when the in-flight run finishes; pends forever without one.
async fn settle(in_flight: &mut Option<InFlightRun>) -> (RunId, Instant, RunResult) {
    match in_flight {
        Some(run) => {
            let result = match (&mut run.handle).await {
                Ok(result) => result,
                Err(join_err) => Err(RunError::Aborted(join_err.to_string())),
            };
            (run.run_id, run.started, result)
        }
        None => std::future::pending().await,
    }
}

/// Resolves at `deadline`; pends forever without one.
async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Requests controller shutdown and waits until it has fully closed.
///
/// Cloneable; any number of callers may call [`ShutdownHandle::shutdown`]
/// concurrently and all of them resolve once the controller is closed.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown: CancellationToken,
    closed: CancellationToken,
}

impl ShutdownHandle {
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.closed.cancelled().await;
    }

    /// Wait for the controller to close without requesting it.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
