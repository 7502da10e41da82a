//! Session storage for persisting login state.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use voltbank::auth::{AccessToken, RefreshToken, Session};
use voltbank::{ApiUrl, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Environment override for the session file location; keeps tests hermetic.
pub const SESSION_FILE_ENV: &str = "VOLTBANK_SESSION_FILE";

/// Stored session data.
///
/// The credential keys match the backend's persistence contract
/// (`accessToken`, `refreshToken`), stored as plain strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    base_url: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    saved_at: DateTime<Utc>,
}

/// A session restored from disk.
pub struct SavedSession {
    pub base_url: ApiUrl,
    pub store: TokenStore,
    pub saved_at: DateTime<Utc>,
}

/// Get the session file path.
fn session_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(SESSION_FILE_ENV) {
        return Ok(PathBuf::from(path));
    }

    let dirs =
        ProjectDirs::from("", "", "voltbank").context("Could not determine config directory")?;

    Ok(dirs.data_dir().join("session.json"))
}

/// Save the session to disk.
pub fn save(base_url: &ApiUrl, store: &TokenStore) -> Result<()> {
    let session = store.get();
    let stored = StoredSession {
        base_url: base_url.to_string(),
        access_token: session.access_token().map(|t| t.as_str().to_string()),
        refresh_token: session.refresh_token().map(|t| t.as_str().to_string()),
        saved_at: Utc::now(),
    };

    let path = session_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    let json = serde_json::to_string_pretty(&stored)?;
    fs::write(&path, &json).context("Failed to write session file")?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(())
}

/// Load the session from disk.
pub fn load() -> Result<Option<SavedSession>> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path).context("Failed to read session file")?;
    let stored: StoredSession = serde_json::from_str(&json).context("Invalid session file")?;
    tracing::debug!(path = %path.display(), "loaded session file");

    let base_url = ApiUrl::new(&stored.base_url).context("Invalid base URL in session")?;
    let store = TokenStore::with_session(Session::new(
        stored.access_token.map(AccessToken::new),
        stored.refresh_token.map(RefreshToken::new),
    ));

    Ok(Some(SavedSession {
        base_url,
        store,
        saved_at: stored.saved_at,
    }))
}

/// Clear the stored session.
pub fn clear() -> Result<()> {
    let path = session_path()?;

    if path.exists() {
        fs::remove_file(&path).context("Failed to remove session file")?;
    }

    Ok(())
}
