//! Single-file conversion: read, decode, encode, write atomically.

use std::any::Any;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::session::WatchConfig;

use super::atomic::write_atomic;
use super::{Codec, CodecError, ConversionOutcome, ConvertError, FailureReason, OutcomeStatus};

/// Warning attached when an HDR source is written to an SDR-only format.
pub const HDR_DOWNCONVERT_WARNING: &str = "HDR source downconverted to SDR";

/// Converts source files into the destination directory of a [`WatchConfig`].
///
/// Owned by one thread at a time; the watch session moves it from the
/// bootstrap pass into the watcher worker.
pub struct ConversionService {
    config: Arc<WatchConfig>,
    codec: Arc<dyn Codec>,
    destination_ready: bool,
}

impl ConversionService {
    pub fn new(config: Arc<WatchConfig>, codec: Arc<dyn Codec>) -> Self {
        Self {
            config,
            codec,
            destination_ready: false,
        }
    }

    /// `destination_dir/<stem>.<ext>` for a source path.
    pub fn destination_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.config
            .destination_dir
            .join(format!("{stem}.{}", self.config.output_format.extension()))
    }

    /// Convert `source` into the destination directory.
    pub fn convert(&mut self, source: &Path) -> ConversionOutcome {
        let destination = self.destination_path(source);
        self.convert_to(source, &destination)
    }

    /// Convert `source` to an explicit destination path.
    pub fn convert_to(&mut self, source: &Path, destination: &Path) -> ConversionOutcome {
        let status = match self.try_convert(source, destination) {
            Ok(None) => OutcomeStatus::Success,
            Ok(Some(warning)) => OutcomeStatus::SuccessWithWarning(warning),
            Err(e) => {
                crate::debug_event!("convert", "failed", "{}: {e}", source.display());
                OutcomeStatus::Failure(FailureReason::from(&e))
            }
        };

        ConversionOutcome {
            source_name: display_name(source),
            destination_name: display_name(destination),
            status,
        }
    }

    fn try_convert(
        &mut self,
        source: &Path,
        destination: &Path,
    ) -> Result<Option<String>, ConvertError> {
        let bytes = fs::read(source).map_err(|e| ConvertError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        let image = guarded(|| self.codec.decode(&bytes)).map_err(ConvertError::Decode)?;
        let options = self.config.encode_options();
        let warning = (image.hdr && !self.codec.supports_hdr(options.format))
            .then(|| HDR_DOWNCONVERT_WARNING.to_string());

        let encoded =
            guarded(|| self.codec.encode(&image, &options)).map_err(ConvertError::Encode)?;

        self.ensure_destination(destination)?;
        write_atomic(destination, &encoded).map_err(|e| ConvertError::Write {
            path: destination.to_path_buf(),
            source: e,
        })?;

        Ok(warning)
    }

    /// Create the destination directory once per service.
    fn ensure_destination(&mut self, destination: &Path) -> Result<(), ConvertError> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        };
        if dir == self.config.destination_dir && self.destination_ready {
            return Ok(());
        }

        fs::create_dir_all(dir).map_err(|e| ConvertError::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if dir == self.config.destination_dir {
            self.destination_ready = true;
        }
        Ok(())
    }
}

/// Run a codec call, turning a panic inside it into a [`CodecError`].
///
/// Codecs parse untrusted bytes. A panic here must fail one file, not
/// take down the watcher worker or a half-started session.
fn guarded<T>(call: impl FnOnce() -> Result<T, CodecError>) -> Result<T, CodecError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(CodecError::Panicked {
            reason: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
