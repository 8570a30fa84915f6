use std::path::{Path, PathBuf};
use std::time::Duration;

use rono::config::build_exclude_set;
use rono::engine::{Controller, ControllerCore, ControllerOptions, ShutdownHandle};
use rono::errors::Result;
use rono::types::ChangeKind;
use rono::watch::WatcherEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fake_executor::{ExecutorProbe, FakeExecutor};
use crate::fake_notifier::{FakeNotifier, NotifierLog};
use crate::reporter::RecordingReporter;

/// Builds a [`Controller`] wired to fakes and spawns it.
pub struct HarnessBuilder {
    entry: PathBuf,
    base_dir: PathBuf,
    debounce: Duration,
    exclude: Vec<String>,
    fatal_initial_failure: bool,
    executor: FakeExecutor,
    notifier: FakeNotifier,
    args: Vec<String>,
}

impl HarnessBuilder {
    /// `entry` is resolved against `/project`.
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            base_dir: PathBuf::from("/project"),
            debounce: Duration::from_millis(50),
            exclude: Vec::new(),
            fatal_initial_failure: false,
            executor: FakeExecutor::new(),
            notifier: FakeNotifier::new(),
            args: Vec::new(),
        }
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.exclude.push(pattern.to_string());
        self
    }

    pub fn fatal_initial_failure(mut self, val: bool) -> Self {
        self.fatal_initial_failure = val;
        self
    }

    pub fn executor(mut self, executor: FakeExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn notifier(mut self, notifier: FakeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Spawn the controller on the current runtime.
    pub fn spawn(self) -> Harness {
        let mut options = ControllerOptions::new(self.entry, self.base_dir);
        options.debounce = self.debounce;
        options.exclude = build_exclude_set(&self.exclude).expect("invalid exclude glob");
        options.fatal_initial_failure = self.fatal_initial_failure;

        let core = ControllerCore::new(options);
        let entry = core.entry().to_path_buf();
        let probe = self.executor.probe();
        let notifier_log = self.notifier.log();
        let reports = RecordingReporter::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let controller = Controller::new(
            core,
            self.executor,
            self.notifier,
            rx,
            Box::new(reports.clone()),
            self.args,
        );

        let token = CancellationToken::new();
        let shutdown = controller.shutdown_handle(&token);
        let task = tokio::spawn(controller.run(token.clone()));

        Harness {
            entry,
            events: tx,
            probe,
            notifier: notifier_log,
            reports,
            shutdown,
            token,
            task,
        }
    }
}

/// A running controller plus handles to observe and drive it.
pub struct Harness {
    pub entry: PathBuf,
    pub events: mpsc::UnboundedSender<WatcherEvent>,
    pub probe: ExecutorProbe,
    pub notifier: NotifierLog,
    pub reports: RecordingReporter,
    pub shutdown: ShutdownHandle,
    pub token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl Harness {
    /// Inject a change event as if the watcher had seen it.
    pub fn change(&self, kind: ChangeKind, path: impl AsRef<Path>) {
        let _ = self.events.send(WatcherEvent::Changed {
            kind,
            path: path.as_ref().to_path_buf(),
        });
    }

    /// Inject a `change` event for the entry file.
    pub fn touch_entry(&self) {
        self.change(ChangeKind::Change, self.entry.clone());
    }

    /// Let (virtual) time pass.
    pub async fn advance(&self, by: Duration) {
        tokio::time::sleep(by).await;
    }

    /// Request shutdown, wait for it, and return the controller's result.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.shutdown().await;
        self.join().await
    }

    /// Wait for the controller task to finish on its own.
    pub async fn join(self) -> Result<()> {
        self.task.await.expect("controller task panicked")
    }
}
