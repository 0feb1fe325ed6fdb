//! Watch command: run a session until Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};

use crate::cli::WatchArgs;
use crate::config::{ConfigError, Settings};
use crate::convert::{ConversionOutcome, ImageCodec, OutcomeLevel};
use crate::session::{StartStatus, WatchConfig, WatchSession};
use crate::sink::{LogFileSink, NotificationSink};

/// Prints each outcome to the terminal.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(&self, outcome: &ConversionOutcome) {
        let time = chrono::Local::now().format("%H:%M:%S");
        match outcome.level() {
            OutcomeLevel::Error => eprintln!("{time} {outcome}"),
            _ => println!("{time} {outcome}"),
        }
    }
}

/// Merge command-line overrides into the loaded settings.
///
/// Returns the settings to persist and the session config built from them.
pub fn resolve(args: &WatchArgs, settings: &Settings) -> Result<(Settings, WatchConfig), ConfigError> {
    let mut merged = settings.clone();
    if let Some(source) = &args.source {
        merged.source_dir = Some(source.clone());
    }
    if let Some(destination) = &args.destination {
        merged.destination_dir = Some(destination.clone());
    }
    if let Some(recursive) = args.recursive_override() {
        merged.recursive = recursive;
    }
    if let Some(profile) = &args.color_profile {
        merged.color_profile = Some(profile.clone());
    }
    if let Some(extension) = &args.extension {
        merged.conversion.source_extension = extension.clone();
    }
    if let Some(quality) = args.quality {
        merged.conversion.quality = quality;
    }

    let config = merged.watch_config()?;
    Ok((merged, config))
}

pub async fn run_watch(args: WatchArgs, settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    let (mut settings, config) = resolve(&args, settings)?;

    let log_sink = LogFileSink::in_directory(&config.destination_dir).with_context(|| {
        format!("Cannot open conversion log in {}", config.destination_dir.display())
    })?;
    println!("Logging conversions to {}", log_sink.path().display());

    let console: Arc<dyn NotificationSink> = Arc::new(ConsoleSink);
    let log_file: Arc<dyn NotificationSink> = Arc::new(log_sink);
    let sinks = vec![console, log_file];
    let session = Arc::new(WatchSession::new(Arc::new(ImageCodec)));

    let status = {
        let session = session.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || session.start(config, sinks)).await??
    };

    match status {
        StartStatus::Started { bootstrapped } => {
            if bootstrapped > 0 {
                println!("Converted {bootstrapped} existing file(s)");
            }
        }
        StartStatus::AlreadyRunning => bail!("Session is already running"),
        StartStatus::DirectoryInUse(dir) => bail!("{} is already being watched", dir.display()),
    }

    if !args.no_save {
        let profile: Option<PathBuf> = settings.color_profile.clone();
        settings.record_last_used(&config, profile.as_deref());
        if let Err(e) = settings.save(config_path) {
            tracing::warn!("[cli] could not remember last used folders: {e}");
        }
    }

    println!(
        "Watching {} for .{} files (Ctrl-C to stop)",
        config.source_dir.display(),
        config.source_extension
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    eprintln!("Stopping...");

    tokio::task::spawn_blocking(move || session.stop()).await?;
    Ok(())
}
