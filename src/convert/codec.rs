//! Codec capability used by the conversion service.
//!
//! The service never touches pixel formats directly: it hands source bytes
//! to a [`Codec`] and gets back a [`PixelBuffer`], then asks the same codec
//! to encode that buffer for the output format.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use super::CodecError;

/// Decoded image as tightly packed 8-bit RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triples, `width * height * 3` bytes.
    pub data: Vec<u8>,
    /// The source carried more dynamic range than 8-bit RGB can hold.
    pub hdr: bool,
}

impl PixelBuffer {
    /// Wrap raw RGB data, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CodecError::InvalidBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            hdr: false,
        })
    }

    /// Mark whether the decoded source was HDR.
    pub fn with_hdr(mut self, hdr: bool) -> Self {
        self.hdr = hdr;
        self
    }

    /// RGB value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Output formats the pipeline can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum OutputFormat {
    #[default]
    Jpeg,
}

impl OutputFormat {
    /// File extension used for converted files.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Whether `ext` names this format (case-insensitive, any alias).
    pub fn matches_extension(&self, ext: &str) -> bool {
        match self {
            OutputFormat::Jpeg => ["jpg", "jpeg", "jpe"]
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(ext)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Jpeg => f.write_str("JPEG"),
        }
    }
}

/// Parameters for [`Codec::encode`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    /// Quality from 1 (smallest) to 100 (best).
    pub quality: u8,
    /// ICC profile embedded verbatim in the output.
    pub color_profile: Option<Arc<[u8]>>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 90,
            color_profile: None,
        }
    }
}

/// Decode/encode capability.
///
/// Implementations are only ever entered from one thread at a time per
/// session, but must be shareable across sessions.
pub trait Codec: Send + Sync {
    /// Decode a complete source file.
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError>;

    /// Encode a buffer for the requested output format.
    fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>, CodecError>;

    /// Whether `format` can carry HDR content without tone mapping.
    fn supports_hdr(&self, _format: OutputFormat) -> bool {
        false
    }
}

/// Codec backed by the `image` crate.
///
/// Decodes every format the enabled `image` features read (PNG, JPEG, TIFF,
/// OpenEXR, Radiance HDR). Floating point sources are reported as HDR and
/// clamped to 8-bit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
        let img = image::load_from_memory(bytes).map_err(|e| match e {
            image::ImageError::Unsupported(_) => CodecError::Unsupported {
                reason: e.to_string(),
            },
            _ => CodecError::Malformed {
                reason: e.to_string(),
            },
        })?;

        let hdr = matches!(
            img,
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
        );
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        crate::debug_event!("codec", "decoded", "{width}x{height} hdr={hdr}");
        PixelBuffer::new(width, height, rgb.into_raw()).map(|buffer| buffer.with_hdr(hdr))
    }

    fn encode(&self, image: &PixelBuffer, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        match options.format {
            OutputFormat::Jpeg => {
                let mut out = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut out, options.quality);
                if let Some(profile) = &options.color_profile {
                    encoder
                        .set_icc_profile(profile.to_vec())
                        .map_err(|e| CodecError::Rejected {
                            reason: e.to_string(),
                        })?;
                }
                encoder
                    .write_image(&image.data, image.width, image.height, ExtendedColorType::Rgb8)
                    .map_err(|e| CodecError::Rejected {
                        reason: e.to_string(),
                    })?;
                Ok(out)
            }
        }
    }
}
