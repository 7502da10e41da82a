//! Backend API wire contracts and the authenticated request gateway.

pub mod endpoints;
mod gateway;

pub use gateway::{ApiGateway, OutboundCall, SignOutHook};
