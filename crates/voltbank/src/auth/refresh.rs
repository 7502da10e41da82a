//! Single-flight token refresh coordination.
//!
//! When several concurrent calls observe a rejected access credential at the
//! same time, each of them needs a fresh one — but the refresh exchange must
//! run **at most once per expiry**. A herd of redundant refresh calls can
//! invalidate the refresh credential used by the others (server-side
//! rotation) and spuriously log the user out. The [`RefreshCoordinator`]
//! dedupes: the first caller creates the flight and performs the exchange;
//! every later caller observes the in-flight exchange and subscribes to the
//! same outcome.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::AuthError;

use super::store::TokenStore;
use super::tokens::{AccessToken, RefreshToken};

/// Outcome of one refresh flight, delivered to every waiter.
type FlightOutcome = Result<AccessToken, AuthError>;

/// The network side of the refresh exchange.
///
/// Implemented over HTTP by the gateway; tests drive the coordinator with a
/// scripted exchange. Transport failures, non-2xx statuses, and malformed
/// responses all map to [`AuthError::RefreshFailed`].
#[async_trait]
pub trait RefreshExchange: Send + Sync {
    /// Exchange a refresh credential for a new access credential.
    async fn exchange(&self, refresh: &RefreshToken) -> Result<AccessToken, AuthError>;
}

/// Coordinates refresh exchanges so at most one is in flight at a time.
///
/// All writes to the [`TokenStore`] happen here: the new access credential
/// on success, a full clear on failure. Refresh failures are never retried
/// automatically; a fresh login is required.
pub struct RefreshCoordinator {
    store: TokenStore,
    exchange: Arc<dyn RefreshExchange>,
    // Some(receiver) while a flight is in progress; None when idle.
    flight: Mutex<Option<watch::Receiver<Option<FlightOutcome>>>>,
}

impl RefreshCoordinator {
    /// Create a coordinator over the given store and exchange.
    pub fn new(store: TokenStore, exchange: Arc<dyn RefreshExchange>) -> Self {
        Self {
            store,
            exchange,
            flight: Mutex::new(None),
        }
    }

    /// Ensure a fresh access credential is available, refreshing if needed.
    ///
    /// If a refresh flight is already in progress the caller attaches to its
    /// pending result instead of starting a second exchange. Otherwise this
    /// caller leads the flight: it reads the refresh credential (failing
    /// immediately with [`AuthError::NoRefreshCredential`] if absent, no
    /// network call), performs the exchange, publishes the outcome to every
    /// waiter, and resets the flight to idle.
    #[instrument(skip(self))]
    pub async fn ensure_fresh_credential(&self) -> Result<AccessToken, AuthError> {
        let role = {
            let mut flight = self.flight.lock().expect("refresh flight lock poisoned");
            match flight.as_ref() {
                Some(rx) => Role::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *flight = Some(rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => {
                debug!("attaching to in-flight refresh");
                loop {
                    if let Some(outcome) = rx.borrow_and_update().clone() {
                        return outcome;
                    }
                    if rx.changed().await.is_err() {
                        // Leader was dropped before publishing an outcome.
                        return Err(AuthError::RefreshFailed {
                            message: "refresh abandoned".to_string(),
                        });
                    }
                }
            }
            Role::Leader(tx) => {
                // Resets the flight slot to idle even if this future is
                // dropped mid-exchange, so a later caller can start anew.
                let _guard = FlightGuard { flight: &self.flight };

                let outcome = self.run_exchange().await;
                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
        }
    }

    async fn run_exchange(&self) -> FlightOutcome {
        let Some(refresh) = self.store.refresh_token() else {
            debug!("no refresh credential in store");
            return Err(AuthError::NoRefreshCredential);
        };

        match self.exchange.exchange(&refresh).await {
            Ok(access) => {
                self.store.set_access_token(access.clone());
                info!("access credential refreshed");
                Ok(access)
            }
            Err(err) => {
                warn!(error = %err, "refresh exchange failed, clearing session");
                self.store.clear();
                Err(err)
            }
        }
    }
}

enum Role {
    Leader(watch::Sender<Option<FlightOutcome>>),
    Follower(watch::Receiver<Option<FlightOutcome>>),
}

struct FlightGuard<'a> {
    flight: &'a Mutex<Option<watch::Receiver<Option<FlightOutcome>>>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut flight) = self.flight.lock() {
            *flight = None;
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self
            .flight
            .lock()
            .map(|flight| flight.is_some())
            .unwrap_or(false);
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use crate::auth::Session;

    use super::*;

    /// Exchange that counts calls and can be held open until released.
    struct ScriptedExchange {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        outcome: fn(&RefreshToken) -> FlightOutcome,
    }

    impl ScriptedExchange {
        fn succeeding(gate: Option<Arc<Notify>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate,
                outcome: |refresh| {
                    assert_eq!(refresh.as_str(), "R1");
                    Ok(AccessToken::new("freshB"))
                },
            }
        }

        fn failing(gate: Option<Arc<Notify>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate,
                outcome: |_| {
                    Err(AuthError::RefreshFailed {
                        message: "rejected".to_string(),
                    })
                },
            }
        }
    }

    #[async_trait]
    impl RefreshExchange for ScriptedExchange {
        async fn exchange(&self, refresh: &RefreshToken) -> Result<AccessToken, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (self.outcome)(refresh)
        }
    }

    fn store_with(access: &str, refresh: &str) -> TokenStore {
        TokenStore::with_session(Session::new(
            Some(AccessToken::new(access)),
            Some(RefreshToken::new(refresh)),
        ))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let store = store_with("expiredA", "R1");
        let gate = Arc::new(Notify::new());
        let exchange = Arc::new(ScriptedExchange::succeeding(Some(gate.clone())));
        let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), exchange.clone()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.ensure_fresh_credential().await
            }));
        }

        // Let all three callers reach the coordinator before releasing.
        tokio::task::yield_now().await;
        gate.notify_waiters();
        gate.notify_one();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.as_str(), "freshB");
        }

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.access_token().unwrap().as_str(), "freshB");
        assert_eq!(store.refresh_token().unwrap().as_str(), "R1");
    }

    #[tokio::test]
    async fn failed_exchange_clears_session_for_all_waiters() {
        let store = store_with("expiredA", "R1");
        let gate = Arc::new(Notify::new());
        let exchange = Arc::new(ScriptedExchange::failing(Some(gate.clone())));
        let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), exchange.clone()));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.ensure_fresh_credential().await
            }));
        }
        tokio::task::yield_now().await;
        gate.notify_waiters();
        gate.notify_one();

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(matches!(outcome, Err(AuthError::RefreshFailed { .. })));
        }

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[tokio::test]
    async fn missing_refresh_credential_fails_without_exchange() {
        let store = TokenStore::new();
        let exchange = Arc::new(ScriptedExchange::failing(None));
        let coordinator = RefreshCoordinator::new(store, exchange.clone());

        let result = coordinator.ensure_fresh_credential().await;

        assert!(matches!(result, Err(AuthError::NoRefreshCredential)));
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn flight_resets_after_completion() {
        let store = store_with("expiredA", "R1");
        let exchange = Arc::new(ScriptedExchange::succeeding(None));
        let coordinator = RefreshCoordinator::new(store, exchange.clone());

        coordinator.ensure_fresh_credential().await.unwrap();
        coordinator.ensure_fresh_credential().await.unwrap();

        // Each sequential call runs its own exchange
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_leader_does_not_wedge_the_coordinator() {
        let store = store_with("expiredA", "R1");
        let gate = Arc::new(Notify::new());
        let exchange = Arc::new(ScriptedExchange::succeeding(Some(gate.clone())));
        let coordinator = Arc::new(RefreshCoordinator::new(store, exchange.clone()));

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh_credential().await })
        };
        tokio::task::yield_now().await;
        leader.abort();
        let _ = leader.await;

        // A later caller starts a fresh flight rather than waiting forever.
        gate.notify_one();
        let token = coordinator.ensure_fresh_credential().await.unwrap();
        assert_eq!(token.as_str(), "freshB");
    }
}
