use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

use crate::error::{Error, Result};

/// Default network domain for phone-derived peer ids.
pub const DEFAULT_PEER_DOMAIN: &str = "s.whatsapp.net";

/// Domain used by broadcast/status pseudo-chats.
const BROADCAST_DOMAIN: &str = "broadcast";

/// Addressable identifier of a remote chat participant, `user@domain`.
///
/// The user part may carry a `:<n>` multi-device suffix; [`PeerId::user`]
/// strips it, the raw form is preserved for wire use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Parse a raw identifier into a peer id.
    ///
    /// Requires a non-empty user part and a non-empty domain part.
    pub fn parse(raw: &str) -> Result<Self> {
        let (user, domain) = raw
            .split_once('@')
            .ok_or_else(|| Error::invalid_input(format!("peer id missing domain: {raw:?}")))?;
        if user.is_empty() || domain.is_empty() {
            return Err(Error::invalid_input(format!("malformed peer id: {raw:?}")));
        }
        Ok(Self(raw.to_string()))
    }

    /// Build a peer id from a phone number on the default network domain.
    ///
    /// A leading `+` is stripped; the rest must be non-empty.
    pub fn from_phone(phone: &str) -> Result<Self> {
        let digits = phone.trim_start_matches('+');
        if digits.is_empty() {
            return Err(Error::invalid_input("empty phone number"));
        }
        Ok(Self(format!("{digits}@{DEFAULT_PEER_DOMAIN}")))
    }

    /// User part with any `:<n>` multi-device suffix removed.
    pub fn user(&self) -> &str {
        let user = self.0.split('@').next().unwrap_or_default();
        user.split(':').next().unwrap_or_default()
    }

    /// Domain part of the id.
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map(|(_, d)| d).unwrap_or_default()
    }

    /// Whether this id denotes a broadcast/status pseudo-chat.
    pub fn is_broadcast(&self) -> bool {
        self.domain() == BROADCAST_DOMAIN
    }

    /// Raw wire form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
