use anyhow::Context;
use clap::Parser;

use story_uploader::cli::Cli;
use story_uploader::{commands, config};

fn init_logging(level: &str) {
    let level = level.parse().unwrap_or(log::LevelFilter::Info);

    // RUST_LOG is parsed last so it wins over the configured level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app_config =
        config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        app_config.log_level = level.clone();
    }

    init_logging(&app_config.log_level);
    log::info!("Starting story-uploader v{}", env!("CARGO_PKG_VERSION"));

    let command_name = cli.command.name();
    commands::run(cli.command, app_config, cli.config.as_deref())
        .await
        .with_context(|| format!("{} failed", command_name))?;

    Ok(())
}
