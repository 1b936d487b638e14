//! HTTP forwarder to the network session sidecar.
//!
//! The sidecar owns the actual network session; this client translates
//! each capability call into a JSON POST against its API.

use std::time::Duration;

use {
    async_trait::async_trait,
    serde::Serialize,
    tracing::debug,
};

use crate::{
    client::{MessengerClient, Presence},
    error::{Error, Result},
    peer::PeerId,
};

const SIDECAR_TIMEOUT: Duration = Duration::from_secs(15);

/// [`MessengerClient`] backed by the sidecar's HTTP API.
pub struct SidecarMessenger {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct TextSend<'a> {
    to: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quoted_id: Option<&'a str>,
}

#[derive(Serialize)]
struct MediaSend<'a> {
    to: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    caption: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    mimetype: &'a str,
}

#[derive(Serialize)]
struct ReactionSend<'a> {
    to: &'a str,
    glyph: &'a str,
    message_id: &'a str,
}

#[derive(Serialize)]
struct PresenceUpdate<'a> {
    to: &'a str,
    state: &'a str,
}

impl SidecarMessenger {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(SIDECAR_TIMEOUT)
            .build()
            .map_err(|e| Error::external("building sidecar http client", e))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    async fn post<T: Serialize>(&self, tenant_id: &str, path: &str, body: &T) -> Result<()> {
        let url = format!("{}/tenants/{tenant_id}/{path}", self.base_url);
        debug!(tenant_id, %url, "sidecar send");
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::external("sidecar request", e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::unavailable(format!("sidecar answered {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessengerClient for SidecarMessenger {
    async fn send_text(
        &self,
        tenant_id: &str,
        to: &PeerId,
        text: &str,
        quoted_id: Option<&str>,
    ) -> Result<()> {
        self.post(tenant_id, "messages/text", &TextSend {
            to: to.as_str(),
            text,
            quoted_id,
        })
        .await
    }

    async fn send_image(&self, tenant_id: &str, to: &PeerId, url: &str, caption: &str) -> Result<()> {
        self.post(tenant_id, "messages/image", &MediaSend {
            to: to.as_str(),
            url,
            caption,
            mimetype: "",
        })
        .await
    }

    async fn send_audio(&self, tenant_id: &str, to: &PeerId, url: &str) -> Result<()> {
        self.post(tenant_id, "messages/audio", &MediaSend {
            to: to.as_str(),
            url,
            caption: "",
            mimetype: "",
        })
        .await
    }

    async fn send_document(
        &self,
        tenant_id: &str,
        to: &PeerId,
        url: &str,
        mimetype: &str,
        caption: &str,
    ) -> Result<()> {
        self.post(tenant_id, "messages/document", &MediaSend {
            to: to.as_str(),
            url,
            caption,
            mimetype,
        })
        .await
    }

    async fn send_reaction(
        &self,
        tenant_id: &str,
        to: &PeerId,
        glyph: &str,
        message_id: &str,
    ) -> Result<()> {
        self.post(tenant_id, "messages/reaction", &ReactionSend {
            to: to.as_str(),
            glyph,
            message_id,
        })
        .await
    }

    async fn set_presence(&self, tenant_id: &str, to: &PeerId, presence: Presence) -> Result<()> {
        let state = match presence {
            Presence::Composing => "composing",
            Presence::Paused => "paused",
        };
        self.post(tenant_id, "presence", &PresenceUpdate {
            to: to.as_str(),
            state,
        })
        .await
    }
}
