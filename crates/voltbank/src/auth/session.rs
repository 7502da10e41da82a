//! The stored credential pair.

use std::fmt;

use super::tokens::{AccessToken, RefreshToken};

/// The credential pair held by the [`TokenStore`](super::TokenStore).
///
/// Exactly one `Session` exists per client instance. It is created on login,
/// read on every outbound call, overwritten when a refresh succeeds, and
/// cleared when a refresh fails or is impossible. Absence of either
/// credential is represented as `None`, never as an error.
#[derive(Clone, Default)]
pub struct Session {
    access: Option<AccessToken>,
    refresh: Option<RefreshToken>,
}

impl Session {
    /// Create a session from a credential pair.
    pub fn new(access: Option<AccessToken>, refresh: Option<RefreshToken>) -> Self {
        Self { access, refresh }
    }

    /// Create an empty session (both credentials absent).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the access credential, if present.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access.as_ref()
    }

    /// Returns the refresh credential, if present.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh.as_ref()
    }

    /// Replace the access credential, leaving the refresh credential as-is.
    pub(crate) fn set_access_token(&mut self, token: AccessToken) {
        self.access = Some(token);
    }

    /// Returns true if an access credential is present.
    pub fn has_access_token(&self) -> bool {
        self.access.is_some()
    }

    /// Returns true if a refresh credential is present.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh.is_some()
    }
}

// Custom Debug impl that hides credential values
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access", &self.access.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_has_no_credentials() {
        let session = Session::empty();
        assert!(!session.has_access_token());
        assert!(!session.has_refresh_token());
    }

    #[test]
    fn session_hides_tokens_in_debug() {
        let session = Session::new(
            Some(AccessToken::new("access-value")),
            Some(RefreshToken::new("refresh-value")),
        );
        let debug = format!("{:?}", session);
        assert!(!debug.contains("access-value"));
        assert!(!debug.contains("refresh-value"));
    }
}
