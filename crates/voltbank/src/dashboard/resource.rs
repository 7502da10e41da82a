//! Dashboard resource definitions.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::api::endpoints;
use crate::error::{Error, InvalidInputError};

/// The fixed set of resources shown on the admin dashboard.
///
/// Each maps to one independent GET against the backend, all returning the
/// common response envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Rental/revenue summary figures.
    Dashboard,
    /// Admin profiles.
    Profiles,
    /// Charging stations.
    Stations,
    /// Payment packages.
    Packages,
    /// End users.
    Users,
}

impl Resource {
    /// Every dashboard resource, in display order.
    pub const ALL: [Resource; 5] = [
        Resource::Dashboard,
        Resource::Profiles,
        Resource::Stations,
        Resource::Packages,
        Resource::Users,
    ];

    /// The slot name for this resource.
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Dashboard => "dashboard",
            Resource::Profiles => "profiles",
            Resource::Stations => "stations",
            Resource::Packages => "packages",
            Resource::Users => "users",
        }
    }

    /// The backend endpoint path for this resource.
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Dashboard => endpoints::DASHBOARD,
            Resource::Profiles => endpoints::PROFILES,
            Resource::Stations => endpoints::STATIONS,
            Resource::Packages => endpoints::PACKAGES,
            Resource::Users => endpoints::USERS,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| {
                InvalidInputError::Resource {
                    value: s.to_string(),
                }
                .into()
            })
    }
}

/// Lifecycle of one resource slot.
///
/// `Loaded` and `Errored` transition back to `Loading` only via an explicit
/// re-fetch; they never transition automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// A load failure scoped to one resource slot.
///
/// Never escalated to sibling slots.
#[derive(Clone, Debug, Error, Serialize)]
#[error("failed to load {resource}: {message}")]
pub struct ResourceLoadError {
    pub resource: Resource,
    pub message: String,
}

impl ResourceLoadError {
    pub(crate) fn new(resource: Resource, message: impl Into<String>) -> Self {
        Self {
            resource,
            message: message.into(),
        }
    }
}

/// The seam between the loader and the gateway.
///
/// Implemented by [`ApiGateway`](crate::ApiGateway); loader tests drive a
/// scripted fetcher deterministically.
#[async_trait]
pub trait ResourceFetch: Send + Sync {
    /// Fetch one resource's payload through the authenticated pipeline.
    ///
    /// Payloads stay as raw JSON; resource shapes are backend-owned.
    async fn fetch_resource(&self, resource: Resource) -> Result<serde_json::Value, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(resource.name().parse::<Resource>().unwrap(), resource);
        }
    }

    #[test]
    fn unknown_resource_name_is_rejected() {
        assert!("rentals".parse::<Resource>().is_err());
    }

    #[test]
    fn resource_paths_are_distinct() {
        let mut paths: Vec<_> = Resource::ALL.iter().map(|r| r.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Resource::ALL.len());
    }
}
