//! HTTP ingress for the bridge.
//!
//! Two ingestion surfaces share one axum app: the desk posts webhook
//! events at `/webhook/desk/{tenant}`, and the network session adapter
//! posts normalized messages at `/events/network/{tenant}`.

pub mod routes;
pub mod server;

pub use server::{AppState, build_app, serve};
