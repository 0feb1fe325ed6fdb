//! Per-path deduplication of file arrivals.
//!
//! Some backends report one arrival several times (create, then a rename
//! pair, then more writes). An arrival is held until its path has been
//! quiet for the window, delivered once, and any further notification
//! observed within the window after delivery is dropped.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::FileEvent;

/// Fixed deduplication window, about one notification batch.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug)]
struct Pending {
    event: FileEvent,
    last_seen: Instant,
}

/// Collapses repeated arrivals for the same path.
#[derive(Debug)]
pub struct Debouncer {
    /// Arrivals waiting for their path to go quiet.
    pending: HashMap<PathBuf, Pending>,
    /// Paths recently handed out, with the delivery time.
    delivered: HashMap<PathBuf, Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            delivered: HashMap::new(),
            window,
        }
    }

    /// Record an arrival.
    ///
    /// Returns `false` if it duplicates an arrival that is pending or was
    /// delivered within the window.
    pub fn record(&mut self, event: FileEvent) -> bool {
        if let Some(delivered_at) = self.delivered.get(&event.path)
            && event.observed_at <= *delivered_at + self.window
        {
            return false;
        }

        match self.pending.entry(event.path.clone()) {
            Entry::Occupied(mut entry) => {
                let pending = entry.get_mut();
                pending.last_seen = pending.last_seen.max(event.observed_at);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Pending {
                    last_seen: event.observed_at,
                    event,
                });
                true
            }
        }
    }

    /// Extend the quiet period of a pending path that is still being written.
    pub fn touch(&mut self, path: &Path, at: Instant) {
        if let Some(pending) = self.pending.get_mut(path) {
            pending.last_seen = pending.last_seen.max(at);
        }
    }

    /// Treat `path` as delivered at `at`, e.g. when it was converted before
    /// the watcher started.
    pub fn mark_delivered(&mut self, path: PathBuf, at: Instant) {
        self.pending.remove(&path);
        self.delivered.insert(path, at);
    }

    /// Take arrivals whose path has been quiet for the window, oldest first.
    pub fn take_ready(&mut self, now: Instant) -> Vec<FileEvent> {
        let window = self.window;
        let mut ready = Vec::new();

        self.pending.retain(|_, pending| {
            if now.saturating_duration_since(pending.last_seen) >= window {
                ready.push(pending.event.clone());
                false
            } else {
                true
            }
        });

        ready.sort_by_key(|event| event.observed_at);
        for event in &ready {
            self.delivered.insert(event.path.clone(), now);
        }
        ready
    }

    /// Forget deliveries that can no longer suppress anything.
    ///
    /// Call only after every notification observed before `now` has been
    /// recorded.
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.delivered
            .retain(|_, at| now.saturating_duration_since(*at) <= window);
    }

    /// Drop every arrival still waiting to settle, oldest first.
    pub fn discard_pending(&mut self) -> Vec<FileEvent> {
        let mut dropped: Vec<_> = self.pending.drain().map(|(_, p)| p.event).collect();
        dropped.sort_by_key(|event| event.observed_at);
        dropped
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}
