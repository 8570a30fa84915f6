// src/engine/watch_set.rs

//! The set of files the controller currently observes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use tracing::debug;

use crate::watch::path_utils::normalize_path;

/// Paths to subscribe/unsubscribe after a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchDelta {
    pub to_add: Vec<PathBuf>,
    pub to_remove: Vec<PathBuf>,
}

impl WatchDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Absolute, normalized file paths under observation.
///
/// Invariant: the entry path is always a member.
#[derive(Debug, Clone)]
pub struct WatchSet {
    entry: PathBuf,
    base_dir: PathBuf,
    exclude: GlobSet,
    paths: HashSet<PathBuf>,
}

impl WatchSet {
    /// Create a set containing only `entry`.
    ///
    /// Relative paths handed to [`WatchSet::reconcile`] are resolved against
    /// `base_dir`; dependency paths matching `exclude` are never watched.
    pub fn new(entry: &Path, base_dir: &Path, exclude: GlobSet) -> Self {
        let entry = normalize_path(base_dir, entry);
        let mut paths = HashSet::new();
        paths.insert(entry.clone());
        Self {
            entry,
            base_dir: base_dir.to_path_buf(),
            exclude,
            paths,
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// Snapshot of the current members, sorted for stable output.
    pub fn to_sorted_vec(&self) -> Vec<PathBuf> {
        let mut v: Vec<PathBuf> = self.paths.iter().cloned().collect();
        v.sort();
        v
    }

    /// Replace the set with `entry ∪ dependencies` and return what changed.
    ///
    /// Linear in the size of the old set plus the dependency list.
    pub fn reconcile<I, P>(&mut self, dependencies: I) -> WatchDelta
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut next: HashSet<PathBuf> = HashSet::with_capacity(self.paths.len());
        next.insert(self.entry.clone());

        for dep in dependencies {
            let path = normalize_path(&self.base_dir, dep.as_ref());
            if path != self.entry && self.exclude.is_match(&path) {
                debug!(path = ?path, "dependency excluded from watching");
                continue;
            }
            next.insert(path);
        }

        let to_add: Vec<PathBuf> = next.difference(&self.paths).cloned().collect();
        let to_remove: Vec<PathBuf> = self.paths.difference(&next).cloned().collect();

        self.paths = next;

        debug!(
            added = to_add.len(),
            removed = to_remove.len(),
            watched = self.paths.len(),
            "reconciled watch set"
        );

        WatchDelta { to_add, to_remove }
    }
}
