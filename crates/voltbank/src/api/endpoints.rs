//! Endpoint paths and request/response wire types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Endpoint Paths
// ============================================================================

/// POST: authenticate with email and password.
pub const LOGIN: &str = "/api/login";

/// POST: exchange a refresh credential for a new access credential.
pub const REFRESH: &str = "/api/refresh";

/// GET: rental/revenue summary figures.
pub const DASHBOARD: &str = "/api/dashboard";

/// GET: admin profiles.
pub const PROFILES: &str = "/api/profiles";

/// GET: charging stations.
pub const STATIONS: &str = "/api/stations";

/// GET: payment packages.
pub const PACKAGES: &str = "/api/packages";

/// GET: end users.
pub const USERS: &str = "/api/users";

/// Header carrying the anti-forgery token on the refresh exchange.
pub const CSRF_HEADER: &str = "X-CSRFTOKEN";

// ============================================================================
// Request/Response Types
// ============================================================================

/// The envelope wrapped around every API response.
///
/// `success: false` inside a 2xx status is an application-level error, not a
/// gateway-level one.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Request body for login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `data` payload of a successful login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
}

/// Request body for the refresh exchange.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `data` payload of a successful refresh.
///
/// The refresh credential is not rotated by this endpoint; only the access
/// credential is replaced.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub access_token: String,
}
