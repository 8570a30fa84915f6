// src/watch/notifier.rs

//! The change-notification seam between the controller and a file watcher.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::ChangeKind;

/// Message sent from a notifier to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    Changed { kind: ChangeKind, path: PathBuf },
    Error(String),
}

/// Subscription to filesystem changes for a dynamic set of paths.
///
/// Events are delivered out of band (typically over an mpsc channel handed
/// to the notifier at construction).
pub trait ChangeNotifier: Send {
    /// Start reporting changes for `paths`.
    fn watch(&mut self, paths: &[PathBuf]) -> Result<()>;

    /// Stop reporting changes for `paths`.
    fn unwatch(&mut self, paths: &[PathBuf]) -> Result<()>;

    /// Stop listening entirely. Resolves once no further events will be sent.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
