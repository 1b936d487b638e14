//! Typing-presence synchronization.
//!
//! Outbound sends are bracketed composing → paused. Presence is
//! best-effort: failures are logged and never abort the send, and the
//! paused transition runs on every exit path so a peer never sees
//! "typing…" indefinitely.

use std::{sync::Arc, time::Duration};

use {
    deskbridge_messaging::{MessengerClient, PeerId, Presence},
    tracing::warn,
};

const TYPING_DELAY_MIN_MS: u64 = 500;
const TYPING_DELAY_MAX_MS: u64 = 2000;

/// Bridges desk typing events and send brackets onto network presence.
pub struct PresenceSynchronizer {
    messenger: Arc<dyn MessengerClient>,
}

impl PresenceSynchronizer {
    pub fn new(messenger: Arc<dyn MessengerClient>) -> Self {
        Self { messenger }
    }

    pub async fn composing(&self, tenant_id: &str, to: &PeerId) {
        self.set(tenant_id, to, Presence::Composing).await;
    }

    pub async fn paused(&self, tenant_id: &str, to: &PeerId) {
        self.set(tenant_id, to, Presence::Paused).await;
    }

    async fn set(&self, tenant_id: &str, to: &PeerId, presence: Presence) {
        if let Err(e) = self.messenger.set_presence(tenant_id, to, presence).await {
            warn!(tenant_id, peer = %to, ?presence, error = %e, "presence update failed");
        }
    }
}

/// How long to hold the composing state before a send. Proportional to
/// content length, clamped; UX pacing only, not a correctness mechanism.
pub fn typing_delay(content_len: usize) -> Duration {
    let ms = (TYPING_DELAY_MIN_MS + content_len as u64).clamp(TYPING_DELAY_MIN_MS, TYPING_DELAY_MAX_MS);
    Duration::from_millis(ms)
}
