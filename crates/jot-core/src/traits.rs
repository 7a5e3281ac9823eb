//! Core traits for Jot
//!
//! These traits are the seams between the sync engine and the outside
//! world, so the engine can be driven by a hosted backend and platform
//! reachability in production and by in-memory fakes in tests.
//!
//! ## Key Traits
//!
//! - [`RemoteStore`]: Authoritative note storage, scoped per user
//! - [`ConnectivityMonitor`]: Current reachability plus change notifications

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::RemoteError;
use crate::identity::UserId;
use crate::note::{Note, NoteFields, NoteId};

/// Authenticated CRUD against the authoritative note store
///
/// Every call is scoped to `user`; row ownership is enforced by the
/// implementation (or the server behind it), never by the sync engine.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a note owned by `user`
    async fn insert(&self, user: &UserId, note: &Note) -> Result<(), RemoteError>;

    /// Overwrite the mutable fields of a note
    ///
    /// Updating a note that does not exist remotely is not an error.
    async fn update(&self, user: &UserId, id: &NoteId, fields: &NoteFields)
    -> Result<(), RemoteError>;

    /// Delete a note
    ///
    /// Deleting a note that does not exist remotely is not an error.
    async fn delete(&self, user: &UserId, id: &NoteId) -> Result<(), RemoteError>;

    /// List every note owned by `user`
    async fn list_all(&self, user: &UserId) -> Result<Vec<Note>, RemoteError>;
}

/// Network reachability as seen by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    pub online: bool,
}

impl ConnectivityStatus {
    pub const ONLINE: Self = Self { online: true };
    pub const OFFLINE: Self = Self { online: false };
}

/// Reports reachability and notifies on transitions
///
/// The sync engine never probes the network itself; it asks the monitor.
/// Dropping the receiver returned by [`subscribe`](Self::subscribe)
/// unsubscribes.
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    /// Query the current status
    async fn current_status(&self) -> ConnectivityStatus;

    /// Subscribe to status changes
    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus>;
}
