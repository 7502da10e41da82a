//! Multi-resource dashboard loading.

mod loader;
mod resource;

pub use loader::{DashboardLoader, DashboardSnapshot, SlotSnapshot};
pub use resource::{Resource, ResourceFetch, ResourceLoadError, SlotState};
