//! Desk REST client.
//!
//! All calls carry the tenant's `api_access_token` header and are bounded
//! by the HTTP client timeout; nothing here retries — the dispatcher's
//! unit-of-work deadline is the outer bound.

use std::time::Duration;

use {
    deskbridge_messaging::TenantConfig,
    reqwest::multipart::{Form, Part},
    serde::Deserialize,
    tracing::debug,
};

use crate::error::{Error, Result};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Whether a desk message entry reads as customer- or agent-authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// One conversation as listed by the desk API.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub inbox_id: u64,
}

impl Conversation {
    /// A conversation is reusable iff it sits in the tenant's inbox and is
    /// not resolved.
    pub fn is_reusable(&self, inbox_id: u64) -> bool {
        self.inbox_id == inbox_id && self.status != "resolved"
    }
}

/// A decoded media payload ready for multipart upload.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub filename: String,
    pub mimetype: String,
    pub data: Vec<u8>,
    /// Optional `content` field (caption).
    pub caption: String,
}

#[derive(Debug, Deserialize)]
struct ContactEnvelope {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ContactFilterResponse {
    #[serde(default)]
    payload: Vec<ContactEnvelope>,
}

// The create-contact envelope has varied across desk deployments: some
// answer `payload.contact.id`, others `payload.id`. Tolerate both.
#[derive(Debug, Deserialize)]
struct ContactCreateResponse {
    payload: ContactCreatePayload,
}

#[derive(Debug, Default, Deserialize)]
struct ContactCreatePayload {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    contact: Option<ContactEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ConversationsResponse {
    #[serde(default)]
    payload: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
struct ConversationCreateResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct InboxEnvelope {
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct InboxesResponse {
    #[serde(default)]
    payload: Vec<InboxEnvelope>,
}

/// REST client for one tenant's desk account.
#[derive(Debug, Clone)]
pub struct DeskClient {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    token: String,
}

impl DeskClient {
    pub fn for_tenant(config: &TenantConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self::with_client(
            http,
            &config.desk_url,
            &config.account_id,
            &config.access_token,
        ))
    }

    /// Build a client around an existing `reqwest::Client` (tests point
    /// this at a mock server).
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        account_id: &str,
        token: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, rest: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/{rest}",
            self.base_url, self.account_id
        )
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Look up a contact by exact phone-number filter. First match wins;
    /// the desk's own dedup (or lack of it) is not second-guessed here.
    pub async fn filter_contacts(&self, phone: &str) -> Result<Option<i64>> {
        let body = serde_json::json!({
            "payload": [{
                "attribute_key": "phone_number",
                "filter_operator": "equal_to",
                "values": [format!("+{phone}")],
                "query_operator": null,
            }]
        });
        let response = self
            .http
            .post(self.url("contacts/filter"))
            .header("api_access_token", &self.token)
            .json(&body)
            .send()
            .await?;
        let parsed: ContactFilterResponse = self.check(response).await?.json().await?;
        Ok(parsed.payload.first().map(|c| c.id))
    }

    pub async fn create_contact(
        &self,
        phone: &str,
        name: &str,
        identifier: &str,
    ) -> Result<i64> {
        let body = serde_json::json!({
            "name": name,
            "phone_number": format!("+{phone}"),
            "identifier": identifier,
        });
        let response = self
            .http
            .post(self.url("contacts"))
            .header("api_access_token", &self.token)
            .json(&body)
            .send()
            .await?;
        let parsed: ContactCreateResponse = self.check(response).await?.json().await?;
        parsed
            .payload
            .contact
            .map(|c| c.id)
            .or(parsed.payload.id)
            .ok_or_else(|| Error::invalid_input("contact create response carried no id"))
    }

    /// Find a contact by phone or create one. `phone` must already be
    /// digits-only; an empty phone is a caller error, not retried here.
    pub async fn find_or_create_contact(
        &self,
        phone: &str,
        display_name: &str,
        raw_identifier: &str,
    ) -> Result<i64> {
        if phone.is_empty() {
            return Err(Error::invalid_input("empty phone number"));
        }
        if let Some(id) = self.filter_contacts(phone).await? {
            debug!(phone, contact_id = id, "desk contact found");
            return Ok(id);
        }
        let id = self
            .create_contact(phone, display_name, raw_identifier)
            .await?;
        debug!(phone, contact_id = id, "desk contact created");
        Ok(id)
    }

    pub async fn list_conversations(&self, contact_id: i64) -> Result<Vec<Conversation>> {
        let response = self
            .http
            .get(self.url(&format!("contacts/{contact_id}/conversations")))
            .header("api_access_token", &self.token)
            .send()
            .await?;
        let parsed: ConversationsResponse = self.check(response).await?.json().await?;
        Ok(parsed.payload)
    }

    pub async fn create_conversation(&self, contact_id: i64, inbox_id: u64) -> Result<i64> {
        let body = serde_json::json!({
            "contact_id": contact_id,
            "inbox_id": inbox_id,
        });
        let response = self
            .http
            .post(self.url("conversations"))
            .header("api_access_token", &self.token)
            .json(&body)
            .send()
            .await?;
        let parsed: ConversationCreateResponse = self.check(response).await?.json().await?;
        Ok(parsed.id)
    }

    /// Reuse the first listed conversation in the tenant's inbox that is
    /// not resolved, in desk API response order, or create a new one.
    /// Resolved conversations are never reopened.
    pub async fn find_or_create_conversation(
        &self,
        contact_id: i64,
        inbox_id: u64,
    ) -> Result<i64> {
        let conversations = self.list_conversations(contact_id).await?;
        if let Some(open) = conversations.iter().find(|c| c.is_reusable(inbox_id)) {
            debug!(contact_id, conversation_id = open.id, "reusing open conversation");
            return Ok(open.id);
        }
        let id = self.create_conversation(contact_id, inbox_id).await?;
        debug!(contact_id, conversation_id = id, "created conversation");
        Ok(id)
    }

    /// Post a plain text message into a conversation.
    pub async fn create_text_message(
        &self,
        conversation_id: i64,
        content: &str,
        direction: MessageDirection,
        source_id: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "content": content,
            "message_type": direction.as_str(),
            "private": false,
            "source_id": source_id,
        });
        let response = self
            .http
            .post(self.url(&format!("conversations/{conversation_id}/messages")))
            .header("api_access_token", &self.token)
            .json(&body)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    /// Post a media message as multipart with an explicit content type on
    /// the `attachments[]` part.
    pub async fn create_attachment_message(
        &self,
        conversation_id: i64,
        upload: AttachmentUpload,
        direction: MessageDirection,
        source_id: &str,
    ) -> Result<()> {
        let part = Part::bytes(upload.data)
            .file_name(upload.filename)
            .mime_str(&upload.mimetype)?;
        let mut form = Form::new()
            .text("message_type", direction.as_str())
            .text("private", "false")
            .text("source_id", source_id.to_string())
            .part("attachments[]", part);
        if !upload.caption.is_empty() {
            form = form.text("content", upload.caption);
        }
        let response = self
            .http
            .post(self.url(&format!("conversations/{conversation_id}/messages")))
            .header("api_access_token", &self.token)
            .multipart(form)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    /// List account inboxes; used to resolve a configured inbox name to
    /// an id.
    pub async fn list_inboxes(&self) -> Result<Vec<(u64, String)>> {
        let response = self
            .http
            .get(self.url("inboxes"))
            .header("api_access_token", &self.token)
            .send()
            .await?;
        let parsed: InboxesResponse = self.check(response).await?.json().await?;
        Ok(parsed.payload.into_iter().map(|i| (i.id, i.name)).collect())
    }
}
