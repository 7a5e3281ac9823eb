//! Error types shared across the Jot stack

use thiserror::Error;

/// Failure reported by a [`RemoteStore`](crate::RemoteStore) call
///
/// The sync engine treats every variant as "retry later"; the variants exist
/// so that callers can present a meaningful notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Credentials missing, expired, or rejected
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The remote store could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The mutation conflicts with existing remote state (e.g. duplicate id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The remote store rejected the payload
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Any other non-success response
    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Whether the failure is about connectivity rather than the request
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
