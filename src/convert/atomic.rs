//! Temp-file-then-rename writes.
//!
//! The temporary file lives next to the destination so the final rename
//! never crosses a filesystem. Readers see either the old file or the
//! complete new one.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Write `bytes` to `destination` atomically.
pub fn write_atomic(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic_with(destination, |file| file.write_all(bytes))
}

/// Atomically write `destination` using a caller-supplied writer.
///
/// If `write` fails, the temporary file is removed and `destination` is
/// left as it was.
pub fn write_atomic_with<F>(destination: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)?;

    write(temp.as_file_mut())?;
    temp.as_file_mut().flush()?;
    temp.as_file().sync_all()?;
    temp.persist(destination).map_err(|e| e.error)?;

    crate::debug_event!("convert", "persisted", "{}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".part"))
            .collect()
    }

    #[test]
    fn test_write_creates_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.jpg");

        write_atomic(&dest, b"jpeg bytes").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"jpeg bytes");
        assert!(leftovers(temp.path()).is_empty());
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.jpg");
        fs::write(&dest, b"old").unwrap();

        write_atomic(&dest, b"new").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn test_interrupted_write_leaves_no_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.jpg");

        let result = write_atomic_with(&dest, |file| {
            file.write_all(b"half of the ")?;
            Err(io::Error::other("killed mid-write"))
        });

        assert!(result.is_err());
        assert!(!dest.exists(), "no partial file at the final path");
        assert!(leftovers(temp.path()).is_empty());

        // A clean run afterwards succeeds.
        write_atomic(&dest, b"complete").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"complete");
    }

    #[test]
    fn test_stale_temp_file_does_not_block_later_writes() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.jpg");
        let stale = temp.path().join(".a.jpg.abc123.part");
        fs::write(&stale, b"truncated").unwrap();

        write_atomic(&dest, b"complete").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"complete");
        assert!(stale.exists(), "stale temp files are not ours to remove");
    }
}
