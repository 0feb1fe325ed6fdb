//! Tracks which source directories currently have a live session.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared claim table. Sessions that must not overlap share one registry;
/// clones refer to the same table.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `dir`. Returns `false` if another session already holds it.
    pub fn claim(&self, dir: &Path) -> bool {
        self.active.lock().insert(dir.to_path_buf())
    }

    pub fn release(&self, dir: &Path) {
        self.active.lock().remove(dir);
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.active.lock().contains(dir)
    }

    /// Claimed directories, sorted.
    pub fn active(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = self.active.lock().iter().cloned().collect();
        dirs.sort();
        dirs
    }
}
