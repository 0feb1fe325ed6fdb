//! Immutable per-session watch parameters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::convert::{EncodeOptions, OutputFormat};

pub const DEFAULT_SOURCE_EXTENSION: &str = "jxr";
pub const DEFAULT_QUALITY: u8 = 90;

/// What a session watches and where converted files go.
///
/// Built once by the caller and shared read-only for the lifetime of the
/// session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub recursive: bool,
    /// ICC profile bytes embedded verbatim into every output.
    pub color_profile: Option<Arc<[u8]>>,
    /// Lowercase, without the leading dot.
    pub source_extension: String,
    pub output_format: OutputFormat,
    pub quality: u8,
}

impl WatchConfig {
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            recursive: false,
            color_profile: None,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            output_format: OutputFormat::default(),
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn color_profile(mut self, profile: Vec<u8>) -> Self {
        self.color_profile = Some(profile.into());
        self
    }

    /// Accepts `jxr`, `.jxr` or `JXR`.
    pub fn source_extension(mut self, extension: &str) -> Self {
        self.source_extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self
    }

    /// Clamped to 1..=100.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Whether `path` carries the watched extension, ignoring case.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.source_extension))
    }

    /// True when converted output would itself look like a source file.
    pub fn output_feeds_back(&self) -> bool {
        self.output_format.matches_extension(&self.source_extension)
            && self.destination_within_source()
    }

    fn destination_within_source(&self) -> bool {
        if self.recursive {
            self.destination_dir.starts_with(&self.source_dir)
        } else {
            self.destination_dir == self.source_dir
        }
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            format: self.output_format,
            quality: self.quality,
            color_profile: self.color_profile.clone(),
        }
    }
}
