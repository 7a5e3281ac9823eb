//! Mock remote store for testing
//!
//! Provides an in-memory [`RemoteStore`] that records every call it
//! receives, so sync logic can be tested for ordering and delivery without
//! a hosted backend.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jot_core::{MockRemoteStore, Note, RemoteStore, UserId};
//!
//! let remote = MockRemoteStore::new();
//! let alice = UserId::new("alice");
//!
//! remote.fail_next(1);
//! assert!(remote.insert(&alice, &Note::new("A", "B")).await.is_err());
//! assert!(remote.insert(&alice, &Note::new("A", "B")).await.is_ok());
//! assert_eq!(remote.calls().len(), 2);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::RemoteError;
use crate::identity::UserId;
use crate::note::{Note, NoteFields, NoteId};
use crate::queue::OpKind;
use crate::traits::RemoteStore;

/// A call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Insert { user: UserId, note: Note },
    Update { user: UserId, id: NoteId, fields: NoteFields },
    Delete { user: UserId, id: NoteId },
    ListAll { user: UserId },
}

impl RemoteCall {
    /// The mutation kind, or `None` for reads
    pub fn kind(&self) -> Option<OpKind> {
        match self {
            Self::Insert { .. } => Some(OpKind::Insert),
            Self::Update { .. } => Some(OpKind::Update),
            Self::Delete { .. } => Some(OpKind::Delete),
            Self::ListAll { .. } => None,
        }
    }

    /// The note a mutation targets
    pub fn note_id(&self) -> Option<&NoteId> {
        match self {
            Self::Insert { note, .. } => Some(&note.id),
            Self::Update { id, .. } | Self::Delete { id, .. } => Some(id),
            Self::ListAll { .. } => None,
        }
    }
}

/// A recorded call and whether it succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub call: RemoteCall,
    pub succeeded: bool,
}

/// An in-memory remote store for testing
///
/// Rows are kept per user in insertion order. Inserting an id that already
/// exists fails with [`RemoteError::Conflict`], which makes double delivery
/// of the same insert observable.
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    /// Rows per user
    rows: DashMap<UserId, Vec<Note>>,
    /// Every call received, in arrival order
    calls: Mutex<Vec<RecordedCall>>,
    /// Number of upcoming calls that fail with a network error
    fail_remaining: AtomicUsize,
    /// Fail every call with a network error
    unreachable: AtomicBool,
    /// Notes whose mutations are rejected
    rejected_notes: Mutex<HashSet<NoteId>>,
    /// Artificial latency applied to every call
    latency: Option<Duration>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that sleeps before answering each call
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Replace the rows owned by `user`
    pub fn seed(&self, user: &UserId, notes: Vec<Note>) {
        self.rows.insert(user.clone(), notes);
    }

    /// Current rows owned by `user`
    pub fn notes_for(&self, user: &UserId) -> Vec<Note> {
        self.rows
            .get(user)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    /// Every call received, successful or not
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().iter().map(|r| r.call.clone()).collect()
    }

    /// Calls that were applied
    pub fn applied_calls(&self) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.succeeded)
            .map(|r| r.call.clone())
            .collect()
    }

    /// Mutation calls (inserts, updates, deletes) that were applied
    pub fn applied_mutations(&self) -> Vec<RemoteCall> {
        self.applied_calls()
            .into_iter()
            .filter(|c| c.kind().is_some())
            .collect()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Fail the next `n` calls with a network error
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Fail every call until reset
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Reject every mutation targeting `id` with a validation error
    pub fn reject_note(&self, id: &NoteId) {
        self.rejected_notes.lock().insert(id.clone());
    }

    /// Stop rejecting mutations targeting `id`
    pub fn accept_note(&self, id: &NoteId) {
        self.rejected_notes.lock().remove(id);
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Decide whether an injected failure applies to `call`
    fn injected_failure(&self, call: &RemoteCall) -> Option<RemoteError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Some(RemoteError::network("remote unreachable"));
        }

        let consumed = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Some(RemoteError::network("injected failure"));
        }

        if let Some(id) = call.note_id()
            && self.rejected_notes.lock().contains(id)
        {
            return Some(RemoteError::Validation(format!("note {} rejected", id)));
        }

        None
    }

    fn record(&self, call: RemoteCall, succeeded: bool) {
        self.calls.lock().push(RecordedCall { call, succeeded });
    }

    fn apply(&self, call: &RemoteCall) -> Result<(), RemoteError> {
        match call {
            RemoteCall::Insert { user, note } => {
                let mut rows = self.rows.entry(user.clone()).or_default();
                if rows.iter().any(|n| n.id == note.id) {
                    return Err(RemoteError::conflict(format!(
                        "duplicate key value violates unique constraint: {}",
                        note.id
                    )));
                }
                rows.push(note.clone());
            }
            RemoteCall::Update { user, id, fields } => {
                if let Some(mut rows) = self.rows.get_mut(user)
                    && let Some(row) = rows.iter_mut().find(|n| &n.id == id)
                {
                    row.title = fields.title.clone();
                    row.desc = fields.desc.clone();
                }
            }
            RemoteCall::Delete { user, id } => {
                if let Some(mut rows) = self.rows.get_mut(user) {
                    rows.retain(|n| &n.id != id);
                }
            }
            RemoteCall::ListAll { .. } => {}
        }
        Ok(())
    }

    async fn handle(&self, call: RemoteCall) -> Result<(), RemoteError> {
        self.simulate_latency().await;

        if let Some(err) = self.injected_failure(&call) {
            self.record(call, false);
            return Err(err);
        }

        let result = self.apply(&call);
        self.record(call, result.is_ok());
        result
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn insert(&self, user: &UserId, note: &Note) -> Result<(), RemoteError> {
        self.handle(RemoteCall::Insert {
            user: user.clone(),
            note: note.clone(),
        })
        .await
    }

    async fn update(
        &self,
        user: &UserId,
        id: &NoteId,
        fields: &NoteFields,
    ) -> Result<(), RemoteError> {
        self.handle(RemoteCall::Update {
            user: user.clone(),
            id: id.clone(),
            fields: fields.clone(),
        })
        .await
    }

    async fn delete(&self, user: &UserId, id: &NoteId) -> Result<(), RemoteError> {
        self.handle(RemoteCall::Delete {
            user: user.clone(),
            id: id.clone(),
        })
        .await
    }

    async fn list_all(&self, user: &UserId) -> Result<Vec<Note>, RemoteError> {
        self.handle(RemoteCall::ListAll { user: user.clone() }).await?;
        Ok(self.notes_for(user))
    }
}
