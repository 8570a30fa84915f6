// src/watch/classify.rs

//! Translate raw `notify` events into [`ChangeKind`]s.

use std::path::PathBuf;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};

use crate::types::ChangeKind;

/// Classify a notify event into zero or more `(kind, path)` changes.
///
/// Access events and unknown kinds carry no content change and yield
/// nothing. Renames become an `unlink` of the old name and an `add` of the
/// new one.
pub fn classify_event(event: &Event) -> Vec<(ChangeKind, PathBuf)> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => tag(event, ChangeKind::AddDir),
        EventKind::Create(CreateKind::File) => tag(event, ChangeKind::Add),
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.is_dir() {
                    ChangeKind::AddDir
                } else {
                    ChangeKind::Add
                };
                (kind, p.clone())
            })
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => tag(event, ChangeKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => tag(event, ChangeKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((ChangeKind::Unlink, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((ChangeKind::Add, to.clone()));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Add
                } else {
                    ChangeKind::Unlink
                };
                (kind, p.clone())
            })
            .collect(),
        EventKind::Modify(_) => tag(event, ChangeKind::Change),

        EventKind::Remove(RemoveKind::Folder) => tag(event, ChangeKind::UnlinkDir),
        EventKind::Remove(_) => tag(event, ChangeKind::Unlink),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn tag(event: &Event, kind: ChangeKind) -> Vec<(ChangeKind, PathBuf)> {
    event.paths.iter().map(|p| (kind, p.clone())).collect()
}
