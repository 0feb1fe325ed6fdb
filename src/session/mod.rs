//! Watch session lifecycle.
//!
//! ```text
//! Idle ──start──> Starting ──(subscribe, bootstrap)──> Running
//!   ^                                                     │
//!   └────────────────────── Stopping <────stop────────────┘
//! ```
//!
//! A session wires a [`FileWatcher`] to a [`ConversionService`] and pushes
//! every outcome through an [`EventQueue`] to its sinks. The subscription is
//! established before the bootstrap pass so files landing during bootstrap
//! are buffered rather than lost.

mod bootstrap;
mod config;
mod registry;

pub use bootstrap::pending_files;
pub use config::{DEFAULT_QUALITY, DEFAULT_SOURCE_EXTENSION, WatchConfig};
pub use registry::SessionRegistry;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::convert::{Codec, ConversionOutcome, ConversionService, OutcomeLevel};
use crate::sink::{Dispatcher, EventQueue, NotificationSink, OutcomePublisher};
use crate::watcher::{FileWatcher, WatchError, WatcherHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        })
    }
}

/// Result of [`WatchSession::start`] when nothing fatal happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartStatus {
    /// Now running; `bootstrapped` files were converted up front.
    Started { bootstrapped: usize },
    /// This session was already starting or running. Nothing changed.
    AlreadyRunning,
    /// Another session sharing the registry watches this directory.
    DirectoryInUse(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    Stopped,
    NotRunning,
}

struct Active {
    source_dir: PathBuf,
    watcher: WatcherHandle,
    dispatcher: Dispatcher,
}

struct Inner {
    state: SessionState,
    active: Option<Active>,
}

/// One watch of one source directory at a time.
///
/// `start` and `stop` may be called from any thread. Dropping a running
/// session stops it.
pub struct WatchSession {
    codec: Arc<dyn Codec>,
    registry: SessionRegistry,
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl WatchSession {
    /// A session with a private registry.
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self::with_registry(codec, SessionRegistry::new())
    }

    /// A session that refuses directories claimed by other sessions on
    /// the same registry.
    pub fn with_registry(codec: Arc<dyn Codec>, registry: SessionRegistry) -> Self {
        Self {
            codec,
            registry,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                active: None,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// The canonical source directory being watched, if running.
    pub fn source_dir(&self) -> Option<PathBuf> {
        self.inner
            .lock()
            .active
            .as_ref()
            .map(|active| active.source_dir.clone())
    }

    /// Start watching.
    ///
    /// Returns once existing files have been converted and the watcher is
    /// live. Fails only when the watch cannot be established, in which case
    /// the session stays [`SessionState::Idle`].
    pub fn start(
        &self,
        config: WatchConfig,
        sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Result<StartStatus, WatchError> {
        {
            let mut inner = self.inner.lock();
            while inner.state == SessionState::Stopping {
                self.changed.wait(&mut inner);
            }
            if inner.state != SessionState::Idle {
                crate::debug_event!("session", "already running");
                return Ok(StartStatus::AlreadyRunning);
            }
            inner.state = SessionState::Starting;
        }

        let mut rollback = StartRollback::new(self);
        let result = self.establish(config, sinks);
        rollback.disarm();

        let mut inner = self.inner.lock();
        let status = match result {
            Ok(Established::Running { active, bootstrapped }) => {
                crate::log_event!("session", "watching", "{}", active.source_dir.display());
                inner.active = Some(active);
                inner.state = SessionState::Running;
                Ok(StartStatus::Started { bootstrapped })
            }
            Ok(Established::InUse(dir)) => {
                inner.state = SessionState::Idle;
                Ok(StartStatus::DirectoryInUse(dir))
            }
            Err(e) => {
                inner.state = SessionState::Idle;
                Err(e)
            }
        };
        self.changed.notify_all();
        status
    }

    fn establish(
        &self,
        config: WatchConfig,
        sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Result<Established, WatchError> {
        let config = Arc::new(normalize(config)?);
        if config.output_feeds_back() {
            return Err(WatchError::InvalidConfig {
                reason: format!(
                    "output format {} would be picked up again as .{} input",
                    config.output_format, config.source_extension
                ),
            });
        }

        let source_dir = config.source_dir.clone();
        if !self.registry.claim(&source_dir) {
            crate::log_event!("session", "directory in use", "{}", source_dir.display());
            return Ok(Established::InUse(source_dir));
        }

        let launched = {
            let mut claim = ClaimRollback::new(&self.registry, &source_dir);
            let launched = self.launch(config, sinks);
            claim.disarm();
            launched
        };

        match launched {
            Ok((watcher, dispatcher, bootstrapped)) => Ok(Established::Running {
                active: Active {
                    source_dir,
                    watcher,
                    dispatcher,
                },
                bootstrapped,
            }),
            Err(e) => {
                self.registry.release(&source_dir);
                Err(e)
            }
        }
    }

    fn launch(
        &self,
        config: Arc<WatchConfig>,
        sinks: Vec<Arc<dyn NotificationSink>>,
    ) -> Result<(WatcherHandle, Dispatcher, usize), WatchError> {
        let mut watcher = FileWatcher::subscribe(config.clone())?;

        let queue = EventQueue::new();
        let publisher = queue.publisher();
        let dispatcher = Dispatcher::spawn(queue.into_receiver(), sinks)?;
        let mut service = ConversionService::new(config.clone(), self.codec.clone());

        let existing = pending_files(&config);
        let mut failed = 0;
        for path in &existing {
            let outcome = service.convert(path);
            watcher.suppress(path.clone(), Instant::now());
            if !outcome.is_success() {
                failed += 1;
            }
            report(&publisher, outcome);
        }
        if !existing.is_empty() {
            crate::log_event!(
                "session",
                "bootstrap",
                "{} existing file(s), {failed} failed",
                existing.len()
            );
        }

        let handle = watcher.start(move |event| {
            crate::debug_event!("session", "arrival", "{:?} {}", event.kind, event.path.display());
            let outcome = service.convert(&event.path);
            report(&publisher, outcome);
        })?;

        Ok((handle, dispatcher, existing.len()))
    }

    /// Stop watching.
    ///
    /// Waits for an in-flight conversion to finish and for every queued
    /// outcome to reach the sinks. No event is delivered after this returns.
    pub fn stop(&self) -> StopStatus {
        let active = {
            let mut inner = self.inner.lock();
            while matches!(inner.state, SessionState::Starting | SessionState::Stopping) {
                self.changed.wait(&mut inner);
            }
            match inner.active.take() {
                Some(active) => {
                    inner.state = SessionState::Stopping;
                    active
                }
                None => return StopStatus::NotRunning,
            }
        };

        let Active {
            source_dir,
            watcher,
            dispatcher,
        } = active;
        let discarded = watcher.stop();
        let delivered = dispatcher.join();
        self.registry.release(&source_dir);
        crate::log_event!(
            "session",
            "stopped",
            "{} ({delivered} outcome(s) delivered, {} arrival(s) not converted)",
            source_dir.display(),
            discarded.len()
        );

        self.inner.lock().state = SessionState::Idle;
        self.changed.notify_all();
        StopStatus::Stopped
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Puts a session back to `Idle` when `start` unwinds part way, so later
/// `start` and `stop` calls do not wait on `Starting` forever.
struct StartRollback<'a> {
    session: &'a WatchSession,
    armed: bool,
}

impl<'a> StartRollback<'a> {
    fn new(session: &'a WatchSession) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StartRollback<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::error!("[session] start aborted, returning to idle");
        self.session.inner.lock().state = SessionState::Idle;
        self.session.changed.notify_all();
    }
}

/// Releases a registry claim when launching unwinds part way.
struct ClaimRollback<'a> {
    registry: &'a SessionRegistry,
    dir: &'a Path,
    armed: bool,
}

impl<'a> ClaimRollback<'a> {
    fn new(registry: &'a SessionRegistry, dir: &'a Path) -> Self {
        Self {
            registry,
            dir,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ClaimRollback<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.release(self.dir);
        }
    }
}

enum Established {
    Running { active: Active, bootstrapped: usize },
    InUse(PathBuf),
}

/// Resolve the source directory so one directory reached through different
/// paths is recognised as the same watch.
fn normalize(mut config: WatchConfig) -> Result<WatchConfig, WatchError> {
    let source = config.source_dir.clone();
    config.source_dir = match fs::canonicalize(&source) {
        Ok(path) if path.is_dir() => path,
        _ => return Err(WatchError::SourceMissing { path: source }),
    };
    config.destination_dir = resolve_destination(&config.destination_dir);
    Ok(config)
}

/// Canonicalize the deepest existing ancestor of `dir` and re-attach the
/// components that do not exist yet.
///
/// A destination that will only be created on the first conversion still
/// resolves through the same symlinks as the source, so the filter can
/// tell when it lies inside the watched tree.
fn resolve_destination(dir: &Path) -> PathBuf {
    let absolute = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |path, part| path.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

fn report(publisher: &OutcomePublisher, outcome: ConversionOutcome) {
    match outcome.level() {
        OutcomeLevel::Info => crate::log_event!("convert", "done", "{outcome}"),
        OutcomeLevel::Warning => tracing::warn!("[convert] {outcome}"),
        OutcomeLevel::Error => tracing::error!("[convert] {outcome}"),
    }
    publisher.publish(outcome);
}
