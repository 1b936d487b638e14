//! Messaging-network capability set and tenant directory.
//!
//! The network session itself (pairing, encryption, delivery) lives outside
//! this workspace; the bridge consumes it through the [`MessengerClient`]
//! trait, keyed by tenant id + target peer id.

pub mod client;
pub mod error;
pub mod peer;
pub mod sidecar;
pub mod tenant;

pub use {
    client::{MessengerClient, Presence},
    error::{Error, Result},
    peer::PeerId,
    sidecar::SidecarMessenger,
    tenant::{InMemoryTenantDirectory, TenantConfig, TenantDirectory},
};
