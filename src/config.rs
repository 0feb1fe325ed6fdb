//! Layered settings for the command-line tool.
//!
//! Sources, later ones winning:
//! - built-in defaults
//! - `.jxrwatch/settings.toml`, found by searching up from the working directory
//! - environment variables prefixed with `JXRWATCH_`
//!
//! Nested keys use a double underscore:
//! - `JXRWATCH_RECURSIVE=true` sets `recursive`
//! - `JXRWATCH_CONVERSION__QUALITY=75` sets `conversion.quality`
//! - `JXRWATCH_LOGGING__DEFAULT=debug` sets `logging.default`
//!
//! The watch core never reads settings itself; [`Settings::watch_config`]
//! turns them into a [`WatchConfig`].

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::session::{DEFAULT_QUALITY, DEFAULT_SOURCE_EXTENSION, WatchConfig};

pub const CONFIG_DIR: &str = ".jxrwatch";
pub const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "JXRWATCH_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("No {which} directory configured. Pass it on the command line or set `{which}_dir`")]
    MissingDirectory { which: &'static str },

    #[error("Cannot read color profile {path}: {source}")]
    ReadProfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration file already exists at {path}. Use --force to overwrite")]
    AlreadyExists { path: PathBuf },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory watched for new source files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,

    /// Directory converted files are written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_dir: Option<PathBuf>,

    /// Watch subdirectories too
    #[serde(default)]
    pub recursive: bool,

    /// ICC profile file embedded into every output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_profile: Option<PathBuf>,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Extension of files to convert, without the dot
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// JPEG quality, 1 to 100
    #[serde(default = "default_quality")]
    pub quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `"jxrwatch::watcher" = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_source_extension() -> String {
    DEFAULT_SOURCE_EXTENSION.to_string()
}
fn default_quality() -> u8 {
    DEFAULT_QUALITY
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            source_dir: None,
            destination_dir: None,
            recursive: false,
            color_profile: None,
            conversion: ConversionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            quality: default_quality(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load from defaults, the discovered settings file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load with `path` as the settings file. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// The settings file in the nearest ancestor holding `.jxrwatch`, or
    /// `.jxrwatch/settings.toml` under the working directory.
    pub fn config_path() -> PathBuf {
        Self::find_config_dir()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
            .join(CONFIG_FILE)
    }

    fn find_config_dir() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write a default settings file under `dir`.
    pub fn init_config_file(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if !force && config_path.exists() {
            return Err(ConfigError::AlreadyExists { path: config_path });
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }

    /// Remember the directories and flags of a watch that was started.
    ///
    /// Paths are stored absolute so a later run from another working
    /// directory finds the same folders.
    pub fn record_last_used(&mut self, config: &WatchConfig, color_profile: Option<&Path>) {
        self.source_dir = Some(absolute(&config.source_dir));
        self.destination_dir = Some(absolute(&config.destination_dir));
        self.recursive = config.recursive;
        self.color_profile = color_profile.map(absolute);
    }

    /// Build the session config, reading the color profile file if one is set.
    pub fn watch_config(&self) -> Result<WatchConfig, ConfigError> {
        let source = self
            .source_dir
            .clone()
            .ok_or(ConfigError::MissingDirectory { which: "source" })?;
        let destination = self
            .destination_dir
            .clone()
            .ok_or(ConfigError::MissingDirectory {
                which: "destination",
            })?;

        let mut config = WatchConfig::new(source, destination)
            .recursive(self.recursive)
            .source_extension(&self.conversion.source_extension)
            .quality(self.conversion.quality);
        if let Some(path) = &self.color_profile {
            config = config.color_profile(read_color_profile(path)?);
        }
        Ok(config)
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Read an ICC profile file verbatim.
pub fn read_color_profile(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| ConfigError::ReadProfile {
        path: path.to_path_buf(),
        source: e,
    })
}
