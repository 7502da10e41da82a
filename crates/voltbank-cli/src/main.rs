//! voltbank - CLI for the VoltBank admin API.
//!
//! This is a thin wrapper over the `voltbank` library, intended for manual
//! inspection and scripting against the admin backend.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Login(args) => commands::login::run(args).await,
        Commands::Logout(args) => commands::logout::run(args).await,
        Commands::Whoami(args) => commands::whoami::run(args).await,
        Commands::RefreshToken(args) => commands::refresh_token::run(args).await,
        Commands::Pull(args) => commands::pull::run(args).await,
        Commands::Get(args) => commands::get::run(args).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
