//! Decides which arrivals are conversion candidates.

use std::path::Path;

use crate::session::WatchConfig;

/// Whether an arrival at `path` should be converted.
///
/// Directories are never forwarded. A path that vanished before the check
/// still passes; its conversion then fails with an I/O error.
pub(crate) fn accepts(config: &WatchConfig, path: &Path) -> bool {
    if !config.matches_extension(path) {
        return false;
    }
    if path.is_dir() {
        return false;
    }
    // Keep our own output out of a recursive watch.
    if config.recursive
        && config.destination_dir != config.source_dir
        && path.starts_with(&config.destination_dir)
    {
        return false;
    }
    true
}
