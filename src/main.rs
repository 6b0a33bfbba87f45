//! Casa Podcast CLI - Sermon Episode Exporter
//!
//! Command-line front-end for the sermon audio export pipeline.

use clap::Parser;
use env_logger::Env;
use log::info;

use casa_podcast::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Casa Podcast v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Export(args)) => commands::export(args)?,
        Some(Commands::Validate(args)) => commands::validate(args)?,
        None => {
            println!("Casa Podcast v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }

    Ok(())
}
