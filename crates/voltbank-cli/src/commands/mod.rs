//! Command implementations.

pub mod get;
pub mod login;
pub mod logout;
pub mod pull;
pub mod refresh_token;
pub mod whoami;

use std::sync::Arc;

use anyhow::{Context, Result};

use voltbank::{ApiGateway, ApiUrl};

use crate::session::{self, SavedSession};

/// Environment override for the backend base URL.
pub const API_URL_ENV: &str = "VOLTBANK_API_URL";

const DEFAULT_API_URL: &str = "https://api.voltbank.example";

/// Resolve the backend base URL: flag, then environment, then default.
pub fn resolve_base_url(flag: Option<String>) -> Result<ApiUrl> {
    let raw = flag
        .or_else(|| std::env::var(API_URL_ENV).ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    ApiUrl::new(&raw).context("Invalid API base URL")
}

/// Load the saved session, failing with a hint when there is none.
pub fn load_required_session() -> Result<SavedSession> {
    session::load()
        .context("Failed to load session")?
        .context("No active session. Run 'voltbank login' first.")
}

/// Build a gateway over a restored session.
///
/// The sign-out hook drops the persisted session file, so a terminally
/// expired session does not linger on disk.
pub fn build_gateway(saved: &SavedSession) -> ApiGateway {
    ApiGateway::new(saved.base_url.clone(), saved.store.clone()).with_sign_out_hook(Arc::new(
        || {
            let _ = session::clear();
        },
    ))
}
