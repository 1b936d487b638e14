/// Crate-wide result type for desk API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed desk API errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied an invalid parameter (empty phone, bad id, …).
    #[error("invalid desk input: {message}")]
    InvalidInput { message: String },

    /// Desk API answered outside the 2xx range.
    #[error("desk API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Tenant has neither an inbox id nor an inbox name configured.
    #[error("tenant {tenant_id} has no inbox id or inbox name")]
    MissingInbox { tenant_id: String },

    /// Configured inbox name does not exist on the desk account.
    #[error("inbox named {name:?} not found on desk account")]
    InboxNotFound { name: String },

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }
}
