//! Network → desk dispatch.
//!
//! One inbound message is one cancellable unit of work: resolve the
//! contact and conversation, claim the delivery in the dedup ledger, then
//! post to the desk. No step retries; a failed message is abandoned to
//! the sender's own retry policy.

use std::{sync::Arc, time::Duration};

use {
    base64::Engine,
    deskbridge_desk::{
        AttachmentUpload, DeskClient, DeliveryLedger, InboxResolver, MessageDirection, source_tag,
    },
    deskbridge_messaging::TenantDirectory,
    tracing::{debug, info, warn},
};

use crate::{
    content::{Classified, InboundMessage, classify, extract_text},
    error::{Error, Result},
};

/// Deadline for one inbound unit of work; in-flight desk calls are
/// aborted when it elapses.
const UNIT_DEADLINE: Duration = Duration::from_secs(30);

/// Forwards network messages into desk conversations.
pub struct InboundDispatcher {
    directory: Arc<dyn TenantDirectory>,
    inboxes: Arc<InboxResolver>,
    ledger: Option<Arc<dyn DeliveryLedger>>,
}

impl InboundDispatcher {
    pub fn new(directory: Arc<dyn TenantDirectory>, inboxes: Arc<InboxResolver>) -> Self {
        Self {
            directory,
            inboxes,
            ledger: None,
        }
    }

    /// Attach a dedup ledger. Without one the guard is absent and every
    /// message is forwarded (fail-open).
    pub fn with_ledger(mut self, ledger: Arc<dyn DeliveryLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Handle one network message end to end.
    pub async fn handle_inbound(&self, tenant_id: &str, msg: &InboundMessage) -> Result<()> {
        match tokio::time::timeout(UNIT_DEADLINE, self.process(tenant_id, msg)).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded),
        }
    }

    async fn process(&self, tenant_id: &str, msg: &InboundMessage) -> Result<()> {
        let tenant = self.directory.get(tenant_id).await?;

        if msg.from_self && !tenant.mirror_self_messages {
            debug!(tenant_id, message_id = %msg.id, "dropping self-originated message");
            return Ok(());
        }
        if msg.peer_id.is_broadcast() {
            debug!(tenant_id, peer = %msg.peer_id, "dropping broadcast pseudo-chat message");
            return Ok(());
        }

        // Replay protection on reconnect/backfill floods.
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let age = now.saturating_sub(msg.timestamp);
        if age > tenant.staleness_secs as i64 {
            debug!(tenant_id, message_id = %msg.id, age_secs = age, "dropping stale message");
            return Ok(());
        }

        let phone = msg.phone();
        if phone.is_empty() {
            warn!(tenant_id, peer = %msg.peer_id, "no phone in peer id, dropping message");
            return Ok(());
        }

        let client = DeskClient::for_tenant(&tenant)?;
        let inbox_id = self.inboxes.resolve(&client, &tenant).await?;
        let contact_id = client
            .find_or_create_contact(phone, msg.display_name(), msg.peer_id.as_str())
            .await?;
        let conversation_id = client
            .find_or_create_conversation(contact_id, inbox_id)
            .await?;

        // Claim the delivery before the desk write so a concurrent
        // duplicate loses the insert race.
        let tag = source_tag(&msg.id);
        if let Some(ledger) = &self.ledger
            && !ledger.record_if_new(conversation_id, &tag).await
        {
            debug!(tenant_id, conversation_id, tag, "duplicate delivery suppressed");
            return Ok(());
        }

        let direction = if msg.from_self {
            MessageDirection::Outgoing
        } else {
            MessageDirection::Incoming
        };

        match msg.content.inline_data() {
            Some(encoded) => {
                let Classified::Media(profile) = classify(msg) else {
                    // Inline payloads only occur on media variants.
                    return Ok(());
                };
                let data = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| Error::validation(format!("bad media payload: {e}")))?;
                let bytes = data.len();
                client
                    .create_attachment_message(
                        conversation_id,
                        AttachmentUpload {
                            filename: profile.filename,
                            mimetype: profile.mimetype,
                            data,
                            caption: profile.caption,
                        },
                        direction,
                        &tag,
                    )
                    .await?;
                info!(tenant_id, conversation_id, bytes, "media forwarded to desk");
            },
            None => {
                let text = extract_text(msg);
                if text.is_empty() {
                    debug!(tenant_id, message_id = %msg.id, "no deliverable text, dropping");
                    return Ok(());
                }
                client
                    .create_text_message(conversation_id, &text, direction, &tag)
                    .await?;
                info!(tenant_id, conversation_id, "text forwarded to desk");
            },
        }

        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        deskbridge_desk::SqliteDeliveryLedger,
        deskbridge_messaging::{InMemoryTenantDirectory, PeerId, TenantConfig},
        crate::content::InboundContent,
        sqlx::SqlitePool,
    };

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    async fn directory(desk_url: &str, mirror_self: bool) -> Arc<InMemoryTenantDirectory> {
        let dir = InMemoryTenantDirectory::new();
        dir.save(TenantConfig {
            tenant_id: "acme".into(),
            desk_url: desk_url.into(),
            account_id: "1".into(),
            access_token: "t".into(),
            inbox_id: Some(3),
            inbox_name: None,
            mirror_self_messages: mirror_self,
            reaction_shortcut: false,
            staleness_secs: 30,
        })
        .await
        .unwrap();
        Arc::new(dir)
    }

    async fn ledger() -> Arc<SqliteDeliveryLedger> {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteDeliveryLedger::init(&pool).await.unwrap();
        Arc::new(SqliteDeliveryLedger::new(pool))
    }

    fn text_message(id: &str, timestamp: i64) -> InboundMessage {
        InboundMessage {
            id: id.into(),
            from_self: false,
            peer_id: PeerId::parse("5511999999999:2@s.whatsapp.net").unwrap(),
            sender_name: Some("Ana".into()),
            timestamp,
            content: InboundContent::Text { body: "hello".into() },
        }
    }

    /// Mocks the resolve path: contact exists, one open conversation in
    /// the tenant inbox.
    async fn mock_resolution(server: &mut mockito::Server) {
        server
            .mock("POST", "/api/v1/accounts/1/contacts/filter")
            .with_status(200)
            .with_body(r#"{"payload":[{"id":42}]}"#)
            .expect_at_least(0)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/accounts/1/contacts/42/conversations")
            .with_status(200)
            .with_body(r#"{"payload":[{"id":9,"status":"open","inbox_id":3}]}"#)
            .expect_at_least(0)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn duplicate_message_writes_to_desk_once() {
        let mut server = mockito::Server::new_async().await;
        mock_resolution(&mut server).await;
        let deliver = server
            .mock("POST", "/api/v1/accounts/1/conversations/9/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "content": "hello",
                "message_type": "incoming",
                "private": false,
                "source_id": "WAID:MSG1",
            })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), false).await,
            Arc::new(InboxResolver::new()),
        )
        .with_ledger(ledger().await);

        let msg = text_message("MSG1", now());
        dispatcher.handle_inbound("acme", &msg).await.unwrap();
        dispatcher.handle_inbound("acme", &msg).await.unwrap();
        deliver.assert_async().await;
    }

    #[tokio::test]
    async fn stale_message_is_dropped_before_contact_resolution() {
        let mut server = mockito::Server::new_async().await;
        let filter = server
            .mock("POST", "/api/v1/accounts/1/contacts/filter")
            .expect(0)
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), false).await,
            Arc::new(InboxResolver::new()),
        );
        let msg = text_message("OLD", now() - 40);
        dispatcher.handle_inbound("acme", &msg).await.unwrap();
        filter.assert_async().await;
    }

    #[tokio::test]
    async fn broadcast_and_self_messages_are_dropped() {
        let mut server = mockito::Server::new_async().await;
        let filter = server
            .mock("POST", "/api/v1/accounts/1/contacts/filter")
            .expect(0)
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), false).await,
            Arc::new(InboxResolver::new()),
        );

        let mut broadcast = text_message("B1", now());
        broadcast.peer_id = PeerId::parse("status@broadcast").unwrap();
        dispatcher.handle_inbound("acme", &broadcast).await.unwrap();

        let mut own = text_message("S1", now());
        own.from_self = true;
        dispatcher.handle_inbound("acme", &own).await.unwrap();

        filter.assert_async().await;
    }

    #[tokio::test]
    async fn mirrored_self_message_is_outgoing() {
        let mut server = mockito::Server::new_async().await;
        mock_resolution(&mut server).await;
        let deliver = server
            .mock("POST", "/api/v1/accounts/1/conversations/9/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "message_type": "outgoing",
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), true).await,
            Arc::new(InboxResolver::new()),
        );
        let mut own = text_message("S2", now());
        own.from_self = true;
        dispatcher.handle_inbound("acme", &own).await.unwrap();
        deliver.assert_async().await;
    }

    #[tokio::test]
    async fn inline_media_is_uploaded_as_multipart() {
        let mut server = mockito::Server::new_async().await;
        mock_resolution(&mut server).await;
        let deliver = server
            .mock("POST", "/api/v1/accounts/1/conversations/9/messages")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data.*".into()),
            )
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), false).await,
            Arc::new(InboxResolver::new()),
        );
        let mut msg = text_message("IMG1", now());
        msg.content = InboundContent::Image {
            mimetype: "image/png".into(),
            caption: "a chart".into(),
            data: Some(base64::engine::general_purpose::STANDARD.encode(b"not-a-real-png")),
        };
        dispatcher.handle_inbound("acme", &msg).await.unwrap();
        deliver.assert_async().await;
    }

    #[tokio::test]
    async fn unsupported_content_without_text_is_dropped_after_resolution() {
        let mut server = mockito::Server::new_async().await;
        mock_resolution(&mut server).await;
        let deliver = server
            .mock("POST", "/api/v1/accounts/1/conversations/9/messages")
            .expect(0)
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), false).await,
            Arc::new(InboxResolver::new()),
        );
        let mut msg = text_message("U1", now());
        msg.content = InboundContent::Unsupported;
        dispatcher.handle_inbound("acme", &msg).await.unwrap();
        deliver.assert_async().await;
    }

    #[tokio::test]
    async fn desk_failure_is_terminal_for_that_message() {
        let mut server = mockito::Server::new_async().await;
        mock_resolution(&mut server).await;
        let _deliver = server
            .mock("POST", "/api/v1/accounts/1/conversations/9/messages")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let dispatcher = InboundDispatcher::new(
            directory(&server.url(), false).await,
            Arc::new(InboxResolver::new()),
        );
        let err = dispatcher
            .handle_inbound("acme", &text_message("F1", now()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Desk(deskbridge_desk::Error::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn unknown_tenant_aborts() {
        let dispatcher = InboundDispatcher::new(
            Arc::new(InMemoryTenantDirectory::new()),
            Arc::new(InboxResolver::new()),
        );
        let err = dispatcher
            .handle_inbound("ghost", &text_message("T1", now()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Messaging(deskbridge_messaging::Error::UnknownTenant { .. })
        ));
    }
}
