// src/watch/watcher.rs

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::ChangeKind;
use crate::watch::cache::FileCache;
use crate::watch::classify::classify_event;
use crate::watch::notifier::{ChangeNotifier, WatcherEvent};

/// Options for [`NotifyWatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatcherOptions {
    /// Drop `change` events whose file content hash did not change.
    pub use_hash: bool,
}

/// State shared with the notify callback thread.
#[derive(Debug, Default)]
struct Shared {
    files: HashSet<PathBuf>,
    cache: Option<FileCache>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// [`ChangeNotifier`] backed by the platform's recommended `notify` watcher.
///
/// Individual files are observed through their parent directory (watched
/// non-recursively and reference counted), so a file that an editor replaces
/// by rename keeps being reported. Events for paths outside the watched file
/// set are dropped in the callback.
pub struct NotifyWatcher {
    inner: Option<RecommendedWatcher>,
    shared: Arc<Mutex<Shared>>,
    dirs: HashMap<PathBuf, usize>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("dirs", &self.dirs)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl NotifyWatcher {
    /// Create a watcher that forwards changes to `tx`. Nothing is watched
    /// until [`ChangeNotifier::watch`] is called.
    pub fn new(tx: mpsc::UnboundedSender<WatcherEvent>, options: WatcherOptions) -> Result<Self> {
        let shared = Arc::new(Mutex::new(Shared {
            files: HashSet::new(),
            cache: options.use_hash.then(FileCache::new),
        }));

        // Runs on notify's own thread, so hashing here never blocks the
        // controller loop.
        let callback_shared = Arc::clone(&shared);
        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => forward_event(&event, &callback_shared, &tx),
                Err(err) => {
                    let _ = tx.send(WatcherEvent::Error(err.to_string()));
                }
            },
            Config::default(),
        )?;

        info!(use_hash = options.use_hash, "file watcher created");

        Ok(Self {
            inner: Some(inner),
            shared,
            dirs: HashMap::new(),
        })
    }

    /// Files currently reported on, sorted.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = lock(&self.shared).files.iter().cloned().collect();
        files.sort();
        files
    }

    fn watch_dir(&mut self, dir: &Path) -> Result<()> {
        let count = self.dirs.entry(dir.to_path_buf()).or_insert(0);
        *count += 1;
        if *count == 1 {
            if let Some(inner) = self.inner.as_mut() {
                if let Err(err) = inner.watch(dir, RecursiveMode::NonRecursive) {
                    self.dirs.remove(dir);
                    return Err(err.into());
                }
                debug!(?dir, "watching directory");
            }
        }
        Ok(())
    }

    fn unwatch_dir(&mut self, dir: &Path) -> Result<()> {
        let Some(count) = self.dirs.get_mut(dir) else {
            return Ok(());
        };
        *count -= 1;
        if *count == 0 {
            self.dirs.remove(dir);
            if let Some(inner) = self.inner.as_mut() {
                inner.unwatch(dir)?;
                debug!(?dir, "stopped watching directory");
            }
        }
        Ok(())
    }
}

fn forward_event(
    event: &Event,
    shared: &Mutex<Shared>,
    tx: &mpsc::UnboundedSender<WatcherEvent>,
) {
    for (kind, path) in classify_event(event) {
        {
            let mut state = lock(shared);
            if !state.files.contains(&path) {
                continue;
            }

            if kind == ChangeKind::Change {
                if let Some(cache) = state.cache.as_mut() {
                    if !cache.has_changed(&path) {
                        debug!(?path, "content unchanged; dropping change event");
                        continue;
                    }
                }
            }
        }

        if tx.send(WatcherEvent::Changed { kind, path }).is_err() {
            // Controller is gone; nothing left to notify.
            return;
        }
    }
}

impl ChangeNotifier for NotifyWatcher {
    fn watch(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut first_err = None;

        for path in paths {
            let inserted = {
                let mut shared = lock(&self.shared);
                let inserted = shared.files.insert(path.clone());
                if inserted {
                    if let Some(cache) = shared.cache.as_mut() {
                        if let Err(err) = cache.update(path) {
                            debug!(error = %err, "could not seed hash for {:?}", path);
                        }
                    }
                }
                inserted
            };
            if !inserted {
                continue;
            }

            let dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();
            if let Err(err) = self.watch_dir(&dir) {
                warn!(?path, error = %err, "failed to watch path");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn unwatch(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut first_err = None;

        for path in paths {
            let removed = {
                let mut shared = lock(&self.shared);
                if let Some(cache) = shared.cache.as_mut() {
                    cache.invalidate(path);
                }
                shared.files.remove(path)
            };
            if !removed {
                continue;
            }

            let dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();
            if let Err(err) = self.unwatch_dir(&dir) {
                warn!(?path, error = %err, "failed to unwatch path");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            lock(&self.shared).files.clear();
            self.dirs.clear();
            // Dropping the watcher joins notify's event thread.
            if let Some(inner) = self.inner.take() {
                tokio::task::spawn_blocking(move || drop(inner))
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            info!("file watcher closed");
            Ok(())
        })
    }
}
