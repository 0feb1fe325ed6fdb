use clap::Parser;
use jxrwatch::Settings;
use jxrwatch::cli::commands::{convert, init, watch};
use jxrwatch::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        return init::run_init(force);
    }

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&config_path).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });
    jxrwatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config => init::run_config(&settings),
        Commands::Watch(args) => watch::run_watch(args, &settings, &config_path).await,
        Commands::Convert {
            source,
            destination,
            color_profile,
            quality,
        } => convert::run_convert(
            &source,
            &destination,
            color_profile.as_deref(),
            quality,
            &settings,
        ),
    }
}
