//! File arrival events and their mapping from native notifications.

use std::path::PathBuf;
use std::time::Instant;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// How a file showed up in the watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    MovedIn,
}

/// A file arrival reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
    /// When the native notification was received.
    pub observed_at: Instant,
}

/// Native notification reduced to what the worker acts on.
#[derive(Debug, Clone)]
pub(crate) enum RawEvent {
    Arrival(FileEvent),
    /// Content of an already-present path changed.
    Touched { path: PathBuf, at: Instant },
}

/// Map one native notification observed at `at`.
pub(crate) fn classify(event: Event, at: Instant) -> Vec<RawEvent> {
    let arrival = |path: PathBuf, kind| {
        RawEvent::Arrival(FileEvent {
            path,
            kind,
            observed_at: at,
        })
    };

    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|p| arrival(p, FileEventKind::Created))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|p| arrival(p, FileEventKind::MovedIn))
            .collect(),
        // [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .into_iter()
            .last()
            .map(|p| arrival(p, FileEventKind::MovedIn))
            .into_iter()
            .collect(),
        // Backends that cannot pair rename halves report both ends this way.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .into_iter()
            .filter(|p| p.exists())
            .map(|p| arrival(p, FileEventKind::MovedIn))
            .collect(),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => event
            .paths
            .into_iter()
            .map(|path| RawEvent::Touched { path, at })
            .collect(),
        _ => Vec::new(),
    }
}
