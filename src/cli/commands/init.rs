//! Init and Config commands.

use anyhow::Context;

use crate::config::Settings;

/// Create `.jxrwatch/settings.toml` in the current directory.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let path = Settings::init_config_file(&cwd, force)?;

    println!("Created configuration file at: {}", path.display());
    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Print the effective settings.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
