//! voltbank - Client library for the VoltBank admin API
//!
//! This library implements the authenticated core of the VoltBank power-bank
//! rental network's admin surface: an [`ApiGateway`] that attaches session
//! credentials to every outbound call and transparently recovers from an
//! expired access credential (refreshing exactly once per expiry, no matter
//! how many calls hit the failure together), and a [`DashboardLoader`] that
//! fans out the dashboard's resources in parallel with per-resource
//! success/failure tracking and selective re-fetch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use voltbank::{ApiGateway, ApiUrl, Credentials, DashboardLoader, TokenStore};
//!
//! # async fn example() -> Result<(), voltbank::Error> {
//! let base = ApiUrl::new("https://api.voltbank.example")?;
//! let store = TokenStore::new();
//! let gateway = ApiGateway::new(base, store);
//!
//! gateway.login(&Credentials::new("admin@voltbank.example", "password")).await?;
//!
//! let loader = DashboardLoader::new(Arc::new(gateway));
//! loader.load_all().await;
//!
//! for slot in loader.snapshot().slots {
//!     println!("{}: {:?}", slot.resource, slot.state);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod types;

// Re-export primary types at crate root for convenience
pub use api::{ApiGateway, OutboundCall};
pub use auth::{AccessToken, Credentials, RefreshToken, Session, TokenStore};
pub use dashboard::{DashboardLoader, Resource, ResourceFetch, SlotState};
pub use error::Error;
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
