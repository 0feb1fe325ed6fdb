//! Error types for the watcher and session control.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a watch from being established.
///
/// Per-file problems never surface here; they become failed outcomes.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Source directory {path} does not exist or is not a directory")]
    SourceMissing { path: PathBuf },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Invalid watch configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to spawn {name} thread: {source}")]
    SpawnFailed {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
