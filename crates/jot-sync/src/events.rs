//! Events broadcast by the sync engine.
//!
//! Presentation code subscribes with [`SyncEngine::subscribe`] to refresh
//! its views and to show transient notices. Slow subscribers may observe
//! `RecvError::Lagged`; events are hints, and the engine's accessors are
//! always authoritative.
//!
//! [`SyncEngine::subscribe`]: crate::SyncEngine::subscribe

use chrono::{DateTime, Utc};
use jot_core::{NoteId, OpKind, RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The note collection changed (local mutation, fetch, or reload)
    NotesChanged,
    /// The engine's view of connectivity changed
    ConnectivityChanged { online: bool },
    /// A sync completed with a successful remote fetch
    Synced { at: DateTime<Utc> },
    /// A queued operation failed remotely and was kept for retry
    ///
    /// `explicit` is set when the failure happened during a sync the user
    /// asked for; background failures are expected to self-heal and are
    /// usually not shown.
    RemoteFailure {
        op: OpKind,
        note_id: NoteId,
        error: RemoteError,
        explicit: bool,
    },
}
