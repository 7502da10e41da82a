//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::session;

use super::{build_gateway, load_required_session};

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(_args: RefreshTokenArgs) -> Result<()> {
    let saved = load_required_session()?;
    let gateway = build_gateway(&saved);

    eprintln!("{}", "Refreshing session...".dimmed());

    gateway
        .refresh_session()
        .await
        .context("Failed to refresh session")?;

    // Save the updated session with the new access credential
    session::save(&saved.base_url, &saved.store).context("Failed to save refreshed session")?;

    output::success("Session refreshed successfully");

    Ok(())
}
