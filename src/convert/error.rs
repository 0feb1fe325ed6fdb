//! Error types for the conversion pipeline.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`Codec`](super::Codec) implementation.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported image format: {reason}")]
    Unsupported { reason: String },

    #[error("malformed image data: {reason}")]
    Malformed { reason: String },

    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGB")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("encoder rejected image: {reason}")]
    Rejected { reason: String },

    #[error("codec panicked: {reason}")]
    Panicked { reason: String },
}

/// Errors from converting a single source file.
///
/// Every variant is recoverable: the watcher reports it as a failed
/// outcome and moves on to the next file.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create destination directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode failed: {0}")]
    Decode(#[source] CodecError),

    #[error("encode failed: {0}")]
    Encode(#[source] CodecError),

    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),
}

/// Coarse failure category carried by a failed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Io,
    Decode,
    Encode,
    Timeout,
}

impl ConvertError {
    /// Category used when the error is surfaced as an outcome.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::Read { .. }
            | ConvertError::CreateDir { .. }
            | ConvertError::Write { .. } => FailureKind::Io,
            ConvertError::Decode(_) => FailureKind::Decode,
            ConvertError::Encode(_) => FailureKind::Encode,
            ConvertError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Io => "IOError",
            FailureKind::Decode => "DecodeError",
            FailureKind::Encode => "EncodeError",
            FailureKind::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}
