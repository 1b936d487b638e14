//! Support-desk REST client and delivery bookkeeping.
//!
//! Covers the desk side of the bridge: finding or creating contacts and
//! conversations, posting messages (JSON and multipart), resolving inbox
//! ids from configured names, and the duplicate-delivery ledger.

pub mod client;
pub mod error;
pub mod inbox;
pub mod ledger;

pub use {
    client::{AttachmentUpload, Conversation, DeskClient, MessageDirection},
    error::{Error, Result},
    inbox::InboxResolver,
    ledger::{DeliveryLedger, SqliteDeliveryLedger, source_tag},
};
