//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;

use voltbank::Resource;

use crate::output;
use crate::session;

use super::{build_gateway, load_required_session};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Resource name (dashboard, profiles, stations, packages, users)
    pub resource: String,
}

pub async fn run(args: GetArgs) -> Result<()> {
    let resource: Resource = args.resource.parse().context("Unknown resource")?;

    let saved = load_required_session()?;
    let gateway = build_gateway(&saved);

    let data: serde_json::Value = gateway
        .get(resource.path())
        .await
        .with_context(|| format!("Failed to fetch {}", resource))?;

    session::save(&saved.base_url, &saved.store).context("Failed to save session")?;

    output::json_pretty(&data)
}
