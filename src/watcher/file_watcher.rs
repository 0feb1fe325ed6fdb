//! Native directory subscription and the single worker that consumes it.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, unbounded};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::session::WatchConfig;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::event::{RawEvent, classify};
use super::{FileEvent, filter};

/// How often the worker checks for debounced arrivals.
const TICK: Duration = Duration::from_millis(50);

/// Native notification stamped with its arrival time.
type Notification = (Instant, notify::Result<Event>);

/// An established subscription that buffers notifications until started.
///
/// The subscription is live as soon as [`FileWatcher::subscribe`] returns,
/// so files arriving while the caller does other work are not missed.
pub struct FileWatcher {
    config: Arc<WatchConfig>,
    watcher: RecommendedWatcher,
    raw_tx: Sender<Notification>,
    raw_rx: Receiver<Notification>,
    debouncer: Debouncer,
}

impl FileWatcher {
    /// Subscribe to changes in `config.source_dir`.
    ///
    /// Fails synchronously if the directory is missing or the backend
    /// refuses the watch.
    pub fn subscribe(config: Arc<WatchConfig>) -> Result<Self, WatchError> {
        let root = config.source_dir.clone();
        if !root.is_dir() {
            return Err(WatchError::SourceMissing { path: root });
        }

        let (raw_tx, raw_rx) = unbounded::<Notification>();
        let tx = raw_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send((Instant::now(), res));
        })?;

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&root, mode)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "subscribed", "{} ({mode:?})", root.display());

        Ok(Self {
            config,
            watcher,
            raw_tx,
            raw_rx,
            debouncer: Debouncer::default(),
        })
    }

    /// Treat `path` as already handled at `at`.
    ///
    /// Used for files converted before the worker starts, so a buffered
    /// notification for the same arrival is not converted again.
    pub fn suppress(&mut self, path: PathBuf, at: Instant) {
        self.debouncer.mark_delivered(path, at);
    }

    /// Start the worker thread. `on_event` runs on that thread, once per
    /// accepted arrival, one call at a time.
    pub fn start<F>(self, on_event: F) -> Result<WatcherHandle, WatchError>
    where
        F: FnMut(FileEvent) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let FileWatcher {
            config,
            watcher,
            raw_tx,
            raw_rx,
            debouncer,
        } = self;

        let worker = Worker {
            config,
            watcher: Some(watcher),
            raw_rx,
            stop_rx,
            debouncer,
            on_event,
            stopping: false,
        };

        let thread = thread::Builder::new()
            .name("jxrwatch-worker".to_string())
            .spawn(move || worker.run())
            .map_err(|e| WatchError::SpawnFailed {
                name: "watcher",
                source: e,
            })?;

        // Only the backend callback may keep the channel open from here on.
        drop(raw_tx);

        Ok(WatcherHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Sender that feeds synthetic notifications to this watcher.
    #[cfg(test)]
    pub(crate) fn injector(&self) -> Sender<Notification> {
        self.raw_tx.clone()
    }
}

/// Handle to a running worker. Dropping it stops the worker.
pub struct WatcherHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<Vec<PathBuf>>>,
}

impl WatcherHandle {
    /// Stop the worker.
    ///
    /// Blocks until the in-flight `on_event` call (if any) returns and the
    /// native subscription is dropped. Arrivals still in the debounce
    /// window are not converted; their paths are returned, oldest first.
    pub fn stop(mut self) -> Vec<PathBuf> {
        self.shutdown()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn shutdown(&mut self) -> Vec<PathBuf> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(discarded)) => discarded,
            Some(Err(_)) => {
                tracing::error!("[watcher] worker thread panicked");
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

struct Worker<F> {
    config: Arc<WatchConfig>,
    watcher: Option<RecommendedWatcher>,
    raw_rx: Receiver<Notification>,
    stop_rx: Receiver<()>,
    debouncer: Debouncer,
    on_event: F,
    stopping: bool,
}

impl<F> Worker<F>
where
    F: FnMut(FileEvent),
{
    /// Returns the arrivals that were observed but not converted.
    fn run(mut self) -> Vec<PathBuf> {
        crate::log_event!("watcher", "started", "{}", self.config.source_dir.display());

        let raw_rx = self.raw_rx.clone();
        let stop_rx = self.stop_rx.clone();
        let mut discarded = Vec::new();

        while !self.stop_requested() {
            select! {
                recv(stop_rx) -> _ => {
                    self.stopping = true;
                    break;
                }
                recv(raw_rx) -> msg => match msg {
                    Ok((at, res)) => self.ingest(at, res),
                    Err(_) => break,
                },
                default(TICK) => {}
            }

            // Everything observed so far must be recorded before pruning.
            while let Ok((at, res)) = raw_rx.try_recv() {
                self.ingest(at, res);
            }

            let now = Instant::now();
            self.debouncer.prune(now);
            for event in self.debouncer.take_ready(now) {
                if self.stop_requested() {
                    discarded.push(event.path);
                    continue;
                }
                (self.on_event)(event);
            }
        }

        drop(self.watcher.take());
        while let Ok((at, res)) = raw_rx.try_recv() {
            self.ingest(at, res);
        }
        discarded.extend(self.debouncer.discard_pending().into_iter().map(|e| e.path));
        for path in &discarded {
            tracing::warn!("[watcher] stopped before converting {}", path.display());
        }

        crate::log_event!("watcher", "stopped", "{}", self.config.source_dir.display());
        discarded
    }

    fn stop_requested(&mut self) -> bool {
        if !self.stopping {
            self.stopping = matches!(
                self.stop_rx.try_recv(),
                Ok(()) | Err(TryRecvError::Disconnected)
            );
        }
        self.stopping
    }

    fn ingest(&mut self, at: Instant, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("[watcher] file watch error: {e}");
                return;
            }
        };

        for raw in classify(event, at) {
            match raw {
                RawEvent::Arrival(arrival) => {
                    if !filter::accepts(&self.config, &arrival.path) {
                        crate::debug_event!("watcher", "ignored", "{}", arrival.path.display());
                        continue;
                    }
                    let path = arrival.path.clone();
                    if !self.debouncer.record(arrival) {
                        crate::debug_event!("watcher", "duplicate", "{}", path.display());
                    }
                }
                RawEvent::Touched { path, at } => self.debouncer.touch(&path, at),
            }
        }
    }
}
