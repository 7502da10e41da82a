//! Error types for the voltbank library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, upstream, and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for voltbank operations.
///
/// This error type covers all possible failure modes in the library,
/// with explicit variants to allow callers to handle specific cases.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (missing or rejected refresh credential).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The session could not be recovered for this call; a fresh login
    /// is required. Carries the call's intent for logging only.
    #[error("session expired during {method} {path}")]
    SessionExpired { method: String, path: String },

    /// Non-auth error status from the backend, passed through verbatim.
    #[error("upstream error: {0}")]
    Upstream(UpstreamError),

    /// The backend returned `success: false` inside a 2xx envelope.
    #[error("API error: {message}")]
    Api { message: String },

    /// The response body could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    /// Input validation errors (invalid API URL, unknown resource).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
///
/// These are `Clone` because a single refresh outcome is delivered to
/// every caller waiting on the same flight.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Invalid login credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No refresh credential is available; a fresh login is required.
    #[error("no refresh credential available")]
    NoRefreshCredential,

    /// The refresh exchange was rejected or failed in transit.
    /// Never retried automatically; a fresh login is required.
    #[error("refresh exchange failed: {message}")]
    RefreshFailed { message: String },
}

/// A non-auth error status from the backend, carried verbatim.
#[derive(Debug)]
pub struct UpstreamError {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl UpstreamError {
    /// Create a new upstream error.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check whether a status code means the access credential was rejected.
    ///
    /// The backend answers 403 as well as 401 for an expired credential, so
    /// both are classified as auth failures here. A true permissions error
    /// will take one wasted refresh round-trip before surfacing.
    pub fn auth_failure_status(status: u16) -> bool {
        status == 401 || status == 403
    }

    /// Check if this error carries an auth-failure status.
    pub fn is_auth_failure(&self) -> bool {
        Self::auth_failure_status(self.status)
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

impl std::error::Error for UpstreamError {}

impl From<UpstreamError> for Error {
    fn from(err: UpstreamError) -> Self {
        Error::Upstream(err)
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL format.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Unknown dashboard resource name.
    #[error("unknown resource '{value}'")]
    Resource { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_classification() {
        assert!(UpstreamError::auth_failure_status(401));
        assert!(UpstreamError::auth_failure_status(403));
        assert!(!UpstreamError::auth_failure_status(404));
        assert!(!UpstreamError::auth_failure_status(500));
    }

    #[test]
    fn upstream_display_includes_status_and_body() {
        let err = UpstreamError::new(503, "maintenance");
        assert_eq!(err.to_string(), "HTTP 503: maintenance");

        let err = UpstreamError::new(500, "");
        assert_eq!(err.to_string(), "HTTP 500");
    }
}
