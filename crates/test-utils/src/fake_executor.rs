use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rono::exec::{RunError, RunExecutor, RunOutput, RunRequest};

/// What a single scripted run does.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Succeed, reporting these dependency files.
    Succeed(Vec<PathBuf>),
    /// Fail as if the process exited with this status.
    Exit(i32),
    /// Fail on an import that cannot be resolved.
    Unresolved(String),
}

#[derive(Debug, Default)]
struct ProbeState {
    calls: Vec<RunRequest>,
    in_flight: usize,
    max_in_flight: usize,
    completed: usize,
}

/// Shared view of what a [`FakeExecutor`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct ExecutorProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl ExecutorProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap()
    }

    /// Number of runs started.
    pub fn runs(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of runs that have finished.
    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    /// Highest number of runs ever outstanding at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn calls(&self) -> Vec<RunRequest> {
        self.lock().calls.clone()
    }

    fn enter(&self, request: &RunRequest) {
        let mut state = self.lock();
        state.calls.push(request.clone());
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
    }

    fn exit(&self) {
        let mut state = self.lock();
        state.in_flight -= 1;
        state.completed += 1;
    }
}

/// A fake executor that:
/// - records every request
/// - takes `delay` (virtual time under `start_paused`) per run
/// - returns scripted outcomes in order, then `fallback` forever.
#[derive(Debug, Clone)]
pub struct FakeExecutor {
    delay: Duration,
    script: Arc<Mutex<VecDeque<FakeOutcome>>>,
    fallback: FakeOutcome,
    probe: ExecutorProbe,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(10),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: FakeOutcome::Succeed(Vec::new()),
            probe: ExecutorProbe::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue the outcome of the next unscripted run.
    pub fn then(self, outcome: FakeOutcome) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Outcome used once the script is exhausted.
    pub fn otherwise(mut self, outcome: FakeOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    pub fn probe(&self) -> ExecutorProbe {
        self.probe.clone()
    }

    fn next_outcome(&self) -> FakeOutcome {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RunExecutor for FakeExecutor {
    fn execute(
        &self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput, RunError>> + Send + '_>> {
        Box::pin(async move {
            self.probe.enter(&request);
            let outcome = self.next_outcome();
            tokio::time::sleep(self.delay).await;
            self.probe.exit();

            match outcome {
                FakeOutcome::Succeed(dependency_files) => Ok(RunOutput { dependency_files }),
                FakeOutcome::Exit(code) => Err(RunError::Exited {
                    entry: request.entry,
                    code: Some(code),
                }),
                FakeOutcome::Unresolved(specifier) => Err(RunError::UnresolvedImport {
                    specifier,
                    importer: request.entry,
                }),
            }
        })
    }
}
