//! Whoami command implementation.

use anyhow::Result;
use clap::Args;

use crate::output;

use super::load_required_session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn run(_args: WhoamiArgs) -> Result<()> {
    let saved = load_required_session()?;
    let session = saved.store.get();

    // Credential presence only; token values are never printed
    output::field("Base URL", saved.base_url.as_str());
    output::field(
        "Access credential",
        if session.has_access_token() {
            "present"
        } else {
            "absent"
        },
    );
    output::field(
        "Refresh credential",
        if session.has_refresh_token() {
            "present"
        } else {
            "absent"
        },
    );
    output::field("Saved at", &saved.saved_at.to_rfc3339());

    Ok(())
}
