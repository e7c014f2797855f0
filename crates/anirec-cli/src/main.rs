//! Anirec CLI
//!
//! Anime recommendations from a free-text request.

use anirec_core::error::exit_codes;
use anirec_core::{AnirecError, Config};
use anyhow::Result;
use clap::Parser;

mod app;
mod commands;
mod output;
mod progress;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<AnirecError>()
            .map(AnirecError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Recommend(args) => {
            commands::recommend::run(args, config, cli.format, cli.verbose).await
        },
        Commands::Search(args) => commands::search::run(args, config, cli.format).await,
        Commands::Ingest(args) => commands::ingest::run(args, config).await,
        Commands::Config => commands::config::run(&config),
    }
}
