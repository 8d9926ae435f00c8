use thiserror::Error;

/// Typed outcome of every callable-service and store operation.
///
/// `FailedPrecondition` carries a friendly message meant for direct display
/// ("you can't add yourself"); it is part of normal control flow, not a bug.
/// `ResourceExhausted` is the only variant callers may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("sign in first")]
    Unauthenticated,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    ResourceExhausted(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::ResourceExhausted(_))
    }
}
