//! Pull command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use voltbank::dashboard::SlotState;
use voltbank::DashboardLoader;

use crate::output;
use crate::session;

use super::{build_gateway, load_required_session};

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Output the full snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: PullArgs) -> Result<()> {
    let saved = load_required_session()?;
    let gateway = build_gateway(&saved);
    let loader = DashboardLoader::new(Arc::new(gateway));

    eprintln!("{}", "Loading dashboard resources...".dimmed());

    loader.load_all().await;
    let snapshot = loader.snapshot();

    // The refresh pipeline may have rotated the access credential
    session::save(&saved.base_url, &saved.store).context("Failed to save session")?;

    if args.json {
        return output::json_pretty(&snapshot);
    }

    for slot in &snapshot.slots {
        match slot.state {
            SlotState::Loaded => output::success(slot.resource.name()),
            SlotState::Errored => {
                let message = slot
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                output::error(&format!("{}: {}", slot.resource, message));
            }
            // load_all settles every slot; Idle/Loading would mean a bug
            SlotState::Idle | SlotState::Loading => {
                output::error(&format!("{}: did not settle", slot.resource));
            }
        }
    }

    if snapshot.slots.iter().all(|s| s.state == SlotState::Errored) {
        anyhow::bail!("every dashboard resource failed to load");
    }

    Ok(())
}
