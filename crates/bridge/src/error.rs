/// Crate-wide result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error taxonomy.
///
/// Validation errors abort a message with a logged warning; desk and
/// messaging failures abort that message only. Nothing here is retried —
/// retry belongs to the webhook sender or an operator re-driving a
/// message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty/unparseable phone, peer id, or payload field.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The unit-of-work deadline elapsed; in-flight calls were aborted.
    #[error("unit of work deadline exceeded")]
    DeadlineExceeded,

    /// Desk API failure (non-2xx, transport, config).
    #[error(transparent)]
    Desk(#[from] deskbridge_desk::Error),

    /// Messaging capability failure.
    #[error(transparent)]
    Messaging(#[from] deskbridge_messaging::Error),
}

impl Error {
    #[must_use]
    pub fn validation(message: impl std::fmt::Display) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }
}
