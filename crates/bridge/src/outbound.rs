//! Desk → network dispatch.
//!
//! Parses desk webhook events, resolves the target peer, brackets sends
//! with typing presence, and drives the messaging capability set.

use std::{sync::Arc, time::Duration};

use {
    deskbridge_messaging::{MessengerClient, PeerId, TenantConfig, TenantDirectory},
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    markup,
    presence::{PresenceSynchronizer, typing_delay},
};

const UNIT_DEADLINE: Duration = Duration::from_secs(30);

/// Prefix marking bridge-originated desk messages (loop prevention).
const BRIDGE_SOURCE_PREFIX: &str = "WAID:";

/// A desk webhook event. Field layout follows the desk's wire shape;
/// everything is optional because the desk omits fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub private: bool,
    // Some desk versions spell the flag differently.
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<WebhookAttachment>,
    #[serde(default)]
    pub conversation: WebhookConversation,
    #[serde(default)]
    pub content_attributes: WebhookContentAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookAttachment {
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub data_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConversation {
    #[serde(default)]
    pub meta: WebhookMeta,
    #[serde(default)]
    pub contact_inbox: WebhookContactInbox,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookMeta {
    #[serde(default)]
    pub sender: WebhookSender,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookSender {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookContactInbox {
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookContentAttributes {
    #[serde(default)]
    pub in_reply_to_external_id: Option<String>,
}

/// The event kinds the bridge reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TypingOn,
    TypingOff,
    MessageCreated,
    Other,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        match self.event.as_str() {
            "conversation_typing_on" => EventKind::TypingOn,
            "conversation_typing_off" => EventKind::TypingOff,
            "message_created" => EventKind::MessageCreated,
            _ => EventKind::Other,
        }
    }

    pub fn is_private(&self) -> bool {
        self.private || self.is_private
    }

    fn in_reply_to(&self) -> Option<&str> {
        self.content_attributes
            .in_reply_to_external_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    /// Resolve the target peer: explicit sender identifier, then the
    /// contact-inbox source id, then the phone number. The first
    /// non-empty candidate must parse; there is no second fallback.
    pub fn resolve_peer(&self) -> Result<PeerId> {
        let sender = &self.conversation.meta.sender;
        if let Some(id) = sender.identifier.as_deref().filter(|s| !s.is_empty()) {
            return Ok(PeerId::parse(id)?);
        }
        if let Some(sid) = self
            .conversation
            .contact_inbox
            .source_id
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            return Ok(PeerId::parse(sid)?);
        }
        if let Some(phone) = sender.phone_number.as_deref().filter(|s| !s.is_empty()) {
            return Ok(PeerId::from_phone(phone)?);
        }
        Err(Error::validation("no peer identifier in webhook event"))
    }
}

/// Translates desk webhook events into messaging-network actions.
pub struct OutboundDispatcher {
    directory: Arc<dyn TenantDirectory>,
    messenger: Arc<dyn MessengerClient>,
    presence: PresenceSynchronizer,
}

impl OutboundDispatcher {
    pub fn new(directory: Arc<dyn TenantDirectory>, messenger: Arc<dyn MessengerClient>) -> Self {
        let presence = PresenceSynchronizer::new(Arc::clone(&messenger));
        Self {
            directory,
            messenger,
            presence,
        }
    }

    /// Handle one desk webhook event end to end.
    pub async fn handle_webhook(&self, tenant_id: &str, event: &WebhookEvent) -> Result<()> {
        match tokio::time::timeout(UNIT_DEADLINE, self.process(tenant_id, event)).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded),
        }
    }

    async fn process(&self, tenant_id: &str, event: &WebhookEvent) -> Result<()> {
        let tenant = self.directory.get(tenant_id).await?;

        // Internal notes never reach the customer.
        if event.is_private() {
            debug!(tenant_id, "dropping private desk event");
            return Ok(());
        }

        match event.kind() {
            EventKind::TypingOn => {
                if let Some(peer) = self.peer_or_log(tenant_id, event) {
                    self.presence.composing(tenant_id, &peer).await;
                }
                Ok(())
            },
            EventKind::TypingOff => {
                if let Some(peer) = self.peer_or_log(tenant_id, event) {
                    self.presence.paused(tenant_id, &peer).await;
                }
                Ok(())
            },
            EventKind::MessageCreated => self.handle_message_created(tenant_id, &tenant, event).await,
            EventKind::Other => {
                debug!(tenant_id, event = %event.event, "unhandled desk event");
                Ok(())
            },
        }
    }

    async fn handle_message_created(
        &self,
        tenant_id: &str,
        tenant: &TenantConfig,
        event: &WebhookEvent,
    ) -> Result<()> {
        if event.message_type.as_deref() != Some("outgoing") {
            debug!(tenant_id, "dropping non-agent message event");
            return Ok(());
        }
        // An inbound-forwarded message re-surfacing as a desk event must
        // not bounce back to the network.
        if event
            .source_id
            .as_deref()
            .is_some_and(|s| s.starts_with(BRIDGE_SOURCE_PREFIX))
        {
            debug!(tenant_id, source_id = ?event.source_id, "dropping bridge-originated message");
            return Ok(());
        }
        let Some(peer) = self.peer_or_log(tenant_id, event) else {
            return Ok(());
        };

        let content = event.content.as_deref().unwrap_or_default();

        self.presence.composing(tenant_id, &peer).await;
        tokio::time::sleep(typing_delay(content.len())).await;

        let sent = self.dispatch(tenant_id, tenant, &peer, content, event).await;

        // Unconditional, or the peer sees "typing…" forever.
        self.presence.paused(tenant_id, &peer).await;
        sent
    }

    async fn dispatch(
        &self,
        tenant_id: &str,
        tenant: &TenantConfig,
        peer: &PeerId,
        content: &str,
        event: &WebhookEvent,
    ) -> Result<()> {
        if !event.attachments.is_empty() {
            for attachment in &event.attachments {
                if attachment.data_url.is_empty() {
                    continue;
                }
                let file_type = attachment.file_type.as_str();
                if file_type.starts_with("image") {
                    self.messenger
                        .send_image(tenant_id, peer, &attachment.data_url, content)
                        .await?;
                } else if file_type.starts_with("audio") {
                    self.messenger
                        .send_audio(tenant_id, peer, &attachment.data_url)
                        .await?;
                } else {
                    self.messenger
                        .send_document(tenant_id, peer, &attachment.data_url, file_type, content)
                        .await?;
                }
            }
            return Ok(());
        }

        if content.is_empty() {
            debug!(tenant_id, "message event with nothing to send");
            return Ok(());
        }

        let reply_to = event.in_reply_to();
        if tenant.reaction_shortcut
            && markup::is_single_emoji(content)
            && let Some(message_id) = reply_to
        {
            self.messenger
                .send_reaction(tenant_id, peer, content, message_id)
                .await?;
            return Ok(());
        }

        let text = markup::desk_to_network(content);
        self.messenger
            .send_text(tenant_id, peer, &text, reply_to)
            .await?;
        Ok(())
    }

    /// Peer resolution failures are logged validation errors, never fatal
    /// to the webhook batch.
    fn peer_or_log(&self, tenant_id: &str, event: &WebhookEvent) -> Option<PeerId> {
        match event.resolve_peer() {
            Ok(peer) => Some(peer),
            Err(e) => {
                warn!(tenant_id, error = %e, "cannot resolve target peer, dropping event");
                None
            },
        }
    }
}
