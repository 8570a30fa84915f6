use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use rono::errors::{Result, RonoError};
use rono::watch::ChangeNotifier;

/// One call made on a [`FakeNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Watch(Vec<PathBuf>),
    Unwatch(Vec<PathBuf>),
    Close,
}

#[derive(Debug, Default)]
struct LogState {
    calls: Vec<NotifierCall>,
    watched: BTreeSet<PathBuf>,
    fail_watch: bool,
}

/// Shared record of everything a [`FakeNotifier`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct NotifierLog {
    state: Arc<Mutex<LogState>>,
}

impl NotifierLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<NotifierCall> {
        self.lock().calls.clone()
    }

    /// Currently subscribed paths.
    pub fn watched(&self) -> BTreeSet<PathBuf> {
        self.lock().watched.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, NotifierCall::Close))
            .count()
    }

    /// Every path ever passed to `unwatch`, in call order.
    pub fn unwatched(&self) -> Vec<PathBuf> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                NotifierCall::Unwatch(paths) => Some(paths.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Make subsequent `watch` calls fail.
    pub fn fail_watch(&self, fail: bool) {
        self.lock().fail_watch = fail;
    }
}

/// A [`ChangeNotifier`] that only records calls. Events are injected by the
/// test through the controller's channel.
#[derive(Debug, Clone, Default)]
pub struct FakeNotifier {
    log: NotifierLog,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> NotifierLog {
        self.log.clone()
    }
}

impl ChangeNotifier for FakeNotifier {
    fn watch(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut state = self.log.lock();
        state.calls.push(NotifierCall::Watch(paths.to_vec()));
        if state.fail_watch {
            return Err(RonoError::Other(anyhow::anyhow!("watch limit reached")));
        }
        state.watched.extend(paths.iter().cloned());
        Ok(())
    }

    fn unwatch(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut state = self.log.lock();
        state.calls.push(NotifierCall::Unwatch(paths.to_vec()));
        for path in paths {
            state.watched.remove(path);
        }
        Ok(())
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let mut state = self.log.lock();
            state.calls.push(NotifierCall::Close);
            state.watched.clear();
            Ok(())
        })
    }
}
