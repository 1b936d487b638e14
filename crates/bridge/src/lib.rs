//! Bidirectional message bridge between a messaging-network session and a
//! support-desk backend.
//!
//! Inbound: network message → classify → resolve contact/conversation →
//! dedup → desk API. Outbound: desk webhook → resolve peer → presence →
//! messaging capability set. Delivery is at-most-once / best-effort; no
//! layer here retries.

pub mod content;
pub mod error;
pub mod inbound;
pub mod markup;
pub mod outbound;
pub mod presence;

pub use {
    content::{Classified, InboundContent, InboundMessage, MediaProfile, classify, extract_text},
    error::{Error, Result},
    inbound::InboundDispatcher,
    outbound::{OutboundDispatcher, WebhookEvent},
    presence::PresenceSynchronizer,
};
