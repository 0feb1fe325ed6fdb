//! Convert command: one file, no watching.

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;

use crate::config::{Settings, read_color_profile};
use crate::convert::{ConversionService, ImageCodec};
use crate::session::WatchConfig;

pub fn run_convert(
    source: &Path,
    destination: &Path,
    color_profile: Option<&Path>,
    quality: Option<u8>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let source_dir = source.parent().unwrap_or(Path::new("."));
    let destination_dir = destination.parent().unwrap_or(Path::new("."));

    let mut config = WatchConfig::new(source_dir, destination_dir)
        .quality(quality.unwrap_or(settings.conversion.quality));
    if let Some(path) = color_profile.or(settings.color_profile.as_deref()) {
        config = config.color_profile(read_color_profile(path)?);
    }

    let mut service = ConversionService::new(Arc::new(config), Arc::new(ImageCodec));
    let outcome = service.convert_to(source, destination);
    println!("{outcome}");

    if !outcome.is_success() {
        bail!("Conversion failed");
    }
    Ok(())
}
