//! Synchronous credential storage.

use std::sync::{Arc, Mutex};

use super::session::Session;
use super::tokens::{AccessToken, RefreshToken};

/// Synchronous store for the client's [`Session`].
///
/// `get`/`set`/`clear` never perform network I/O and never fail; absence is
/// represented as empty optional fields. The store is cheap to clone (clones
/// share the same session) and safe to read from any task. The lock is held
/// only for the duration of a copy, never across an await point.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<Mutex<Session>>,
}

impl TokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a session, e.g. one restored
    /// from persistence.
    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Returns a snapshot of the current session.
    pub fn get(&self) -> Session {
        self.lock().clone()
    }

    /// Replace the session wholesale.
    pub fn set(&self, session: Session) {
        *self.lock() = session;
    }

    /// Clear both credentials.
    pub fn clear(&self) {
        *self.lock() = Session::empty();
    }

    /// Returns the current access credential, if present.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.lock().access_token().cloned()
    }

    /// Returns the current refresh credential, if present.
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.lock().refresh_token().cloned()
    }

    /// Overwrite only the access credential, as a successful refresh does.
    pub(crate) fn set_access_token(&self, token: AccessToken) {
        self.lock().set_access_token(token);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        self.inner.lock().expect("token store lock poisoned")
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("session", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_access_token_keeps_refresh_token() {
        let store = TokenStore::with_session(Session::new(
            Some(AccessToken::new("old-access")),
            Some(RefreshToken::new("refresh")),
        ));

        store.set_access_token(AccessToken::new("new-access"));

        assert_eq!(store.access_token().unwrap().as_str(), "new-access");
        assert_eq!(store.refresh_token().unwrap().as_str(), "refresh");
    }

    #[test]
    fn clear_empties_both_credentials() {
        let store = TokenStore::with_session(Session::new(
            Some(AccessToken::new("access")),
            Some(RefreshToken::new("refresh")),
        ));

        store.clear();

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn clones_share_the_same_session() {
        let store = TokenStore::new();
        let clone = store.clone();

        store.set(Session::new(Some(AccessToken::new("access")), None));

        assert!(clone.access_token().is_some());
    }
}
