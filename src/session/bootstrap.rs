//! Files already present when a session starts.

use std::path::PathBuf;

use walkdir::WalkDir;

use super::WatchConfig;
use crate::watcher::accepts;

/// Matching files under the source directory, in filename order.
///
/// Only the top level is listed unless the config is recursive. Unreadable
/// entries are skipped.
pub fn pending_files(config: &WatchConfig) -> Vec<PathBuf> {
    let depth = if config.recursive { usize::MAX } else { 1 };

    WalkDir::new(&config.source_dir)
        .min_depth(1)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                crate::debug_event!("bootstrap", "skipped", "{e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| accepts(config, path))
        .collect()
}
