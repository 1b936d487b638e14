use async_trait::async_trait;

use crate::{error::Result, peer::PeerId};

/// Typing-indicator state shown to a remote peer.
///
/// Composing and Paused are the only states the network exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Composing,
    Paused,
}

/// Capability set of one messaging-network session, keyed by tenant id +
/// target peer. The concrete session (sidecar, embedded client, …) lives
/// outside this workspace.
#[async_trait]
pub trait MessengerClient: Send + Sync {
    /// Send a plain text message, optionally quoting a prior message id.
    async fn send_text(
        &self,
        tenant_id: &str,
        to: &PeerId,
        text: &str,
        quoted_id: Option<&str>,
    ) -> Result<()>;

    /// Send an image from a URL with an optional caption.
    async fn send_image(&self, tenant_id: &str, to: &PeerId, url: &str, caption: &str)
    -> Result<()>;

    /// Send a voice/audio message from a URL. Voice notes carry no caption.
    async fn send_audio(&self, tenant_id: &str, to: &PeerId, url: &str) -> Result<()>;

    /// Send an arbitrary document from a URL with its mimetype and caption.
    async fn send_document(
        &self,
        tenant_id: &str,
        to: &PeerId,
        url: &str,
        mimetype: &str,
        caption: &str,
    ) -> Result<()>;

    /// React to a prior message with an emoji glyph.
    async fn send_reaction(
        &self,
        tenant_id: &str,
        to: &PeerId,
        glyph: &str,
        message_id: &str,
    ) -> Result<()>;

    /// Set the typing-indicator state for a chat.
    async fn set_presence(&self, tenant_id: &str, to: &PeerId, presence: Presence) -> Result<()>;
}
