//! Authentication types, credential storage, and token refresh coordination.
//!
//! All writes to the stored [`Session`] happen inside the
//! [`RefreshCoordinator`] (new-credential-on-success, clear-on-failure) and
//! the gateway's sign-out path; every other component only reads it.

mod credentials;
mod csrf;
mod refresh;
mod session;
mod store;
mod tokens;

pub use credentials::Credentials;
pub use refresh::{RefreshCoordinator, RefreshExchange};
pub use session::Session;
pub use store::TokenStore;
pub use tokens::{AccessToken, RefreshToken};

pub(crate) use csrf::csrf_token;
