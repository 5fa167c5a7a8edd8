//! Tizzl CLI
//!
//! Conversational fashion product search over a local catalog.

use anyhow::Result;
use clap::Parser;
use tizzl_core::error::exit_codes;
use tizzl_core::{Config, TizzlError};

mod app;
mod commands;
mod output;

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

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<TizzlError>()
            .map(|e| e.exit_code())
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Search(args) => commands::search::run(args, &config, cli.format).await,
        Commands::Similar(args) => commands::similar::run(args, &config, cli.format).await,
        Commands::Outfits(args) => commands::outfits::run(args, &config, cli.format).await,
        Commands::Config => commands::config::run(&config, cli.format),
    }
}
