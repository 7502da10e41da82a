//! The authenticated request gateway.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::auth::{
    csrf_token, AccessToken, Credentials, RefreshCoordinator, RefreshExchange, RefreshToken,
    Session, TokenStore,
};
use crate::dashboard::{Resource, ResourceFetch};
use crate::error::{AuthError, Error, UpstreamError};
use crate::types::ApiUrl;

use super::endpoints::{
    self, Envelope, LoginData, LoginRequest, RefreshData, RefreshRequest,
};

/// Hook fired when the session is terminally lost (forced sign-out).
///
/// The library-level stand-in for "navigate to the login surface": clients
/// use it to drop persisted session state or redirect the UI.
pub type SignOutHook = Arc<dyn Fn() + Send + Sync>;

/// One logical request through the gateway.
///
/// Carries everything needed to resend the call verbatim after a refresh,
/// plus the `retried` flag capping recovery at one retry per call no matter
/// how many further auth failures occur.
#[derive(Clone, Debug)]
pub struct OutboundCall {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    retried: bool,
}

impl OutboundCall {
    /// A GET call.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    /// A POST call with a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            retried: false,
        }
    }
}

/// Performs outbound calls with credential attachment, failure
/// classification, and single-retry-after-refresh semantics.
///
/// On an auth-failure status the gateway drives the
/// [`RefreshCoordinator`] (so concurrent calls share one refresh exchange)
/// and resends the original call at most once. Call sites never see a raw
/// 401: an unrecoverable session surfaces as [`Error::SessionExpired`] after
/// the sign-out side effect has fired.
///
/// Cheap to clone; clones share the HTTP client, cookie jar, store, and
/// coordinator.
#[derive(Clone)]
pub struct ApiGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base: ApiUrl,
    store: TokenStore,
    coordinator: RefreshCoordinator,
    on_sign_out: Option<SignOutHook>,
}

impl ApiGateway {
    /// Create a gateway for the given backend over the given store.
    pub fn new(base: ApiUrl, store: TokenStore) -> Self {
        Self::build(base, store, None)
    }

    /// Attach a hook fired on terminal sign-out.
    ///
    /// Must be called before the gateway is cloned or shared; the jar and
    /// client are rebuilt.
    pub fn with_sign_out_hook(self, hook: SignOutHook) -> Self {
        Self::build(
            self.inner.base.clone(),
            self.inner.store.clone(),
            Some(hook),
        )
    }

    fn build(base: ApiUrl, store: TokenStore, on_sign_out: Option<SignOutHook>) -> Self {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .user_agent(concat!("voltbank/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(jar.clone())
            .build()
            .expect("failed to build HTTP client");

        let exchange = Arc::new(HttpRefreshExchange {
            client: client.clone(),
            base: base.clone(),
            jar,
        });
        let coordinator = RefreshCoordinator::new(store.clone(), exchange);

        Self {
            inner: Arc::new(GatewayInner {
                client,
                base,
                store,
                coordinator,
                on_sign_out,
            }),
        }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &ApiUrl {
        &self.inner.base
    }

    /// The credential store backing this gateway.
    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Authenticate and populate the credential store.
    ///
    /// Login runs on the unauthenticated path: a 401 here means bad
    /// credentials and never enters the refresh/retry pipeline.
    #[instrument(skip(self, credentials), fields(base = %self.inner.base, email = %credentials.email()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
        debug!("logging in");

        let url = self.inner.base.endpoint_url(endpoints::LOGIN);
        let request = LoginRequest {
            email: credentials.email(),
            password: credentials.password(),
        };

        let response = self.inner.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if UpstreamError::auth_failure_status(status.as_u16()) {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !status.is_success() {
            return Err(upstream_error(response).await.into());
        }

        let data: LoginData = decode_envelope(response).await?;
        self.inner.store.set(Session::new(
            Some(AccessToken::new(data.access_token)),
            Some(RefreshToken::new(data.refresh_token)),
        ));

        debug!("login succeeded");
        Ok(())
    }

    /// Discard the stored credentials.
    pub fn logout(&self) {
        self.inner.store.clear();
    }

    /// Eagerly renew the access credential.
    ///
    /// Single-flight still applies: if a refresh is already in progress this
    /// attaches to it instead of starting another exchange.
    pub async fn refresh_session(&self) -> Result<AccessToken, Error> {
        self.inner
            .coordinator
            .ensure_fresh_credential()
            .await
            .map_err(Error::Auth)
    }

    /// Perform one outbound call through the full pipeline.
    ///
    /// Successful responses and non-auth error statuses are returned as-is
    /// for the caller to interpret. Auth-failure statuses drive one refresh
    /// and one resend; an unrecoverable session surfaces as
    /// [`Error::SessionExpired`] after the sign-out side effect has fired.
    #[instrument(skip(self, call), fields(method = %call.method, path = %call.path))]
    pub async fn send(&self, mut call: OutboundCall) -> Result<reqwest::Response, Error> {
        let token = self.inner.store.access_token();
        let response = self.perform(&call, token.as_ref()).await?;
        let status = response.status();
        trace!(status = status.as_u16(), "response received");

        if !UpstreamError::auth_failure_status(status.as_u16()) {
            return Ok(response);
        }
        if call.retried {
            // A second auth failure after a retry is terminal.
            return Err(upstream_error(response).await.into());
        }

        debug!(status = status.as_u16(), "credential rejected, refreshing");
        match self.inner.coordinator.ensure_fresh_credential().await {
            Ok(fresh) => {
                call.retried = true;
                let response = self.perform(&call, Some(&fresh)).await?;
                if UpstreamError::auth_failure_status(response.status().as_u16()) {
                    return Err(upstream_error(response).await.into());
                }
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, "session could not be recovered, signing out");
                self.sign_out();
                Err(Error::SessionExpired {
                    method: call.method.to_string(),
                    path: call.path,
                })
            }
        }
    }

    /// GET an endpoint and decode its envelope.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let response = self.send(OutboundCall::get(path)).await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await.into());
        }
        decode_envelope(response).await
    }

    /// POST a JSON body to an endpoint and decode its envelope.
    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Error> {
        let body = serde_json::to_value(body).map_err(|e| Error::Decode {
            message: e.to_string(),
        })?;
        let response = self.send(OutboundCall::post(path, body)).await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await.into());
        }
        decode_envelope(response).await
    }

    async fn perform(
        &self,
        call: &OutboundCall,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.inner.base.endpoint_url(&call.path);
        let mut request = self.inner.client.request(call.method.clone(), &url);

        // Absence of a credential is not an error at this stage; some calls
        // may be unauthenticated.
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    fn sign_out(&self) {
        self.inner.store.clear();
        if let Some(hook) = &self.inner.on_sign_out {
            hook();
        }
    }
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base", &self.inner.base)
            .field("coordinator", &self.inner.coordinator)
            .finish()
    }
}

#[async_trait]
impl ResourceFetch for ApiGateway {
    async fn fetch_resource(&self, resource: Resource) -> Result<serde_json::Value, Error> {
        self.get(resource.path()).await
    }
}

/// The HTTP side of the refresh exchange.
///
/// Posts the refresh credential (and the anti-forgery token when the
/// `csrftoken` cookie is present) to the refresh endpoint. Every failure
/// mode maps to [`AuthError::RefreshFailed`].
struct HttpRefreshExchange {
    client: reqwest::Client,
    base: ApiUrl,
    jar: Arc<Jar>,
}

#[async_trait]
impl RefreshExchange for HttpRefreshExchange {
    async fn exchange(&self, refresh: &RefreshToken) -> Result<AccessToken, AuthError> {
        let url = self.base.endpoint_url(endpoints::REFRESH);
        let mut request = self.client.post(&url).json(&RefreshRequest {
            refresh: refresh.as_str(),
        });
        if let Some(token) = csrf_token(&self.jar, self.base.as_url()) {
            request = request.header(endpoints::CSRF_HEADER, token);
        }

        let response = request.send().await.map_err(|e| AuthError::RefreshFailed {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::RefreshFailed {
                message: format!("refresh endpoint returned HTTP {}", status.as_u16()),
            });
        }

        let envelope: Envelope<RefreshData> =
            response
                .json()
                .await
                .map_err(|e| AuthError::RefreshFailed {
                    message: format!("malformed refresh response: {e}"),
                })?;

        if !envelope.success {
            return Err(AuthError::RefreshFailed {
                message: envelope.message,
            });
        }
        let data = envelope.data.ok_or_else(|| AuthError::RefreshFailed {
            message: "refresh response missing data".to_string(),
        })?;

        Ok(AccessToken::new(data.access_token))
    }
}

/// Read a non-success response into an [`UpstreamError`], body verbatim.
async fn upstream_error(response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    UpstreamError::new(status, body)
}

/// Decode a 2xx response's envelope into its `data` payload.
async fn decode_envelope<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, Error> {
    let body = response.text().await?;
    let envelope: Envelope<R> = serde_json::from_str(&body).map_err(|e| Error::Decode {
        message: e.to_string(),
    })?;

    if !envelope.success {
        return Err(Error::Api {
            message: envelope.message,
        });
    }
    envelope.data.ok_or(Error::Decode {
        message: "response envelope missing data".to_string(),
    })
}
