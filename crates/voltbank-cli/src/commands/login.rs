//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use voltbank::{ApiGateway, Credentials, TokenStore};

use crate::output;
use crate::session;

use super::resolve_base_url;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,

    /// Backend base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

pub async fn run(args: LoginArgs) -> Result<()> {
    let base_url = resolve_base_url(args.base_url)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let store = TokenStore::new();
    let gateway = ApiGateway::new(base_url.clone(), store.clone());
    gateway
        .login(&credentials)
        .await
        .context("Failed to login")?;

    // Save session
    session::save(&base_url, &store).context("Failed to save session")?;

    // Print success
    output::success("Logged in successfully");
    println!();
    output::field("Base URL", base_url.as_str());
    output::field("Email", &args.email);

    Ok(())
}
