use crate::transport::{MediaError, TransportError};
use talkie_core::ServiceError;
use thiserror::Error;

/// Failures of one negotiation attempt. Everything here ends up as plain
/// text in the session status for the UI layer to render.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Terminal for the attempt; surfaced verbatim, never retried.
    #[error("{0}")]
    MicDenied(String),

    #[error("media unavailable: {0}")]
    Media(String),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("signaling: {0}")]
    Signaling(#[from] ServiceError),
}

impl From<MediaError> for SessionError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::PermissionDenied(msg) => SessionError::MicDenied(msg),
            MediaError::Unavailable(msg) => SessionError::Media(msg),
        }
    }
}
