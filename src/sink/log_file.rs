//! Per-session conversion log file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::convert::{ConversionOutcome, OutcomeLevel};

use super::NotificationSink;

/// Appends `<timestamp> - <LEVEL> - <message>` lines to a log file.
///
/// Each session opens its own sink, so sessions never share a logger.
#[derive(Debug)]
pub struct LogFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogFileSink {
    pub const FILE_NAME: &'static str = "conversion.log";

    /// Open (or create) `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Open `conversion.log` inside `dir`.
    pub fn in_directory(dir: &Path) -> io::Result<Self> {
        Self::open(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, level: OutcomeLevel, message: &str) -> io::Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        let line = format!("{timestamp} - {level} - {message}\n");
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl NotificationSink for LogFileSink {
    fn deliver(&self, outcome: &ConversionOutcome) {
        if let Err(e) = self.append(outcome.level(), &outcome.to_string()) {
            tracing::warn!("[log] cannot write {}: {e}", self.path.display());
        }
    }
}
