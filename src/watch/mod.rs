// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - The [`ChangeNotifier`] seam the controller subscribes through.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that reports
//!   changes for an exact, dynamic set of files.
//! - (Optionally) content hashing to drop `change` events for files whose
//!   bytes did not actually change.
//!
//! It does **not** decide when to run anything; it only turns filesystem
//! activity into [`WatcherEvent`]s.

pub mod cache;
pub mod classify;
pub mod notifier;
pub mod path_utils;
pub mod watcher;

pub use cache::{FileCache, compute_file_hash};
pub use classify::classify_event;
pub use notifier::{ChangeNotifier, WatcherEvent};
pub use watcher::{NotifyWatcher, WatcherOptions};
