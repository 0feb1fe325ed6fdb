//! Conversion of one source image into the output format.
//!
//! # Pipeline
//!
//! ```text
//! source file -> read bytes -> Codec::decode -> PixelBuffer
//!             -> Codec::encode (+ ICC profile) -> temp file -> rename
//! ```
//!
//! Every error is folded into a [`ConversionOutcome`] so callers never
//! have to stop on a bad file.

pub mod atomic;
mod codec;
mod error;
mod outcome;
mod service;

pub use codec::{Codec, EncodeOptions, ImageCodec, OutputFormat, PixelBuffer};
pub use error::{CodecError, ConvertError, FailureKind};
pub use outcome::{ConversionOutcome, FailureReason, OutcomeLevel, OutcomeStatus};
pub use service::{ConversionService, HDR_DOWNCONVERT_WARNING};
