use thiserror::Error;

/// Errors surfaced by the relay engine and the client connector.
///
/// Every handshake step is all-or-nothing: the first failing step aborts the
/// connection with one of these, and any partially inserted room state is
/// rolled back before the error propagates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RelayError {
    /// TCP connect, read or write failed.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),
    /// A frame was missing, malformed, or carried an unexpected payload.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The relay rejected the offered password.
    #[error("relay rejected the password")]
    AuthFailed,
    /// The requested room already has both parties attached.
    #[error("room is full")]
    RoomFull,
    /// PAKE or AEAD library failure.
    #[error("crypto failure: {0}")]
    Internal(String),
}

impl RelayError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        RelayError::Protocol(msg.into())
    }

    pub(crate) fn internal(msg: impl std::fmt::Display) -> Self {
        RelayError::Internal(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
