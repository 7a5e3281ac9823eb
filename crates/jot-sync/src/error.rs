//! Error types for the sync engine.

use jot_core::RemoteError;
use jot_storage::StorageError;

/// Result type alias for sync engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by the sync engine.
///
/// Remote failures inside a drain never surface here; they are retained in
/// the queue and reported through [`DrainReport`](crate::DrainReport).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Local persistence failed; in-memory state may be ahead of the store.
    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),

    /// A direct remote read (fetch) failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl SyncError {
    /// Whether this is a remote failure (retryable, never fatal).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error() {
        let err: SyncError = StorageError::io("disk full").into();
        assert!(!err.is_remote());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_remote_error() {
        let err: SyncError = RemoteError::network("offline").into();
        assert!(err.is_remote());
    }
}
