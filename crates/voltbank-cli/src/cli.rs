//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands;

/// VoltBank admin API CLI.
#[derive(Parser, Debug)]
#[command(name = "voltbank")]
#[command(author, about, long_about = None)]
#[command(version = env!("VOLTBANK_VERSION"))]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate and save the session
    Login(commands::login::LoginArgs),

    /// Discard the saved session
    Logout(commands::logout::LogoutArgs),

    /// Display the active session
    Whoami(commands::whoami::WhoamiArgs),

    /// Eagerly renew the access credential
    RefreshToken(commands::refresh_token::RefreshTokenArgs),

    /// Load all dashboard resources concurrently
    Pull(commands::pull::PullArgs),

    /// Fetch a single dashboard resource
    Get(commands::get::GetArgs),
}
