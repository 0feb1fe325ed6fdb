//! File watcher that turns native notifications into conversion work.
//!
//! # Architecture
//!
//! ```text
//! notify backend ──(Instant, Event)──> channel
//!                                        │
//!                                  worker thread
//!                       classify -> filter -> Debouncer
//!                                        │
//!                                 on_event(FileEvent)
//! ```
//!
//! One worker owns the subscription and calls `on_event` synchronously,
//! so callbacks never overlap.

mod debouncer;
mod error;
mod event;
mod file_watcher;
mod filter;

pub use debouncer::{DEBOUNCE_WINDOW, Debouncer};
pub use error::WatchError;
pub use event::{FileEvent, FileEventKind};
pub use file_watcher::{FileWatcher, WatcherHandle};
pub(crate) use filter::accepts;
