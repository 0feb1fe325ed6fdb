//! CLI argument parsing using clap.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch a folder and convert new images to JPEG
#[derive(Parser, Debug)]
#[command(
    name = "jxrwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch a folder and convert new images to JPEG",
    long_about = "Watch a source folder and convert every new image that appears in it \
                  into a JPEG in the destination folder, optionally embedding an ICC profile.\n\n\
                  The built-in codec reads PNG, JPEG, TIFF, OpenEXR and Radiance HDR. \
                  It cannot decode JPEG XR, so with the default `jxr` extension every file \
                  is reported as a decode failure unless an external JPEG XR codec is plugged in. \
                  Use --extension to watch for a format the built-in codec reads.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up .jxrwatch/settings.toml in the current directory
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Watch a folder until Ctrl-C
    Watch(WatchArgs),

    /// Convert a single file and exit
    Convert {
        /// Source image
        source: PathBuf,

        /// Output file
        destination: PathBuf,

        /// ICC profile to embed
        #[arg(long, value_name = "FILE")]
        color_profile: Option<PathBuf>,

        /// JPEG quality, 1 to 100 (overrides config)
        #[arg(short, long)]
        quality: Option<u8>,
    },
}

#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Folder to watch (defaults to the last used one)
    pub source: Option<PathBuf>,

    /// Folder for converted files (defaults to the last used one)
    pub destination: Option<PathBuf>,

    /// Watch subfolders too (remembered for the next run)
    #[arg(short, long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Watch only the top folder, clearing a remembered --recursive
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,

    /// ICC profile to embed in every output
    #[arg(long, value_name = "FILE")]
    pub color_profile: Option<PathBuf>,

    /// Extension of files to convert (overrides config). The built-in codec
    /// reads png, jpg, tif, exr and hdr but not jxr
    #[arg(short, long, value_name = "EXT")]
    pub extension: Option<String>,

    /// JPEG quality, 1 to 100 (overrides config)
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Do not remember these folders as the last used ones
    #[arg(long)]
    pub no_save: bool,
}

impl WatchArgs {
    /// `Some` only when the command line set recursion explicitly.
    pub fn recursive_override(&self) -> Option<bool> {
        if self.recursive {
            Some(true)
        } else if self.no_recursive {
            Some(false)
        } else {
            None
        }
    }
}
