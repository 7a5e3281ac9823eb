//! Pending-operation queue entries
//!
//! A [`QueueOp`] records a local mutation that has not yet been confirmed
//! against the remote store. Entries are applied remotely in the order they
//! were issued locally.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::note::Note;

/// Kind of remote mutation a queue entry represents
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    #[display("insert")]
    Insert,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
}

/// A mutation awaiting remote confirmation
///
/// `note` is the full state of the note at the time the mutation was issued:
/// the created note for inserts, the updated note for updates, and the last
/// known state for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueOp {
    /// Identity of this queue entry, used to remove exactly this entry once
    /// its remote call succeeds
    #[serde(default = "Uuid::new_v4")]
    pub op_id: Uuid,
    /// The mutation kind
    pub op: OpKind,
    /// Note state carried by the mutation
    pub note: Note,
    /// When the mutation was issued locally
    #[serde(default = "Utc::now")]
    pub queued_at: DateTime<Utc>,
}

impl QueueOp {
    fn new(op: OpKind, note: Note) -> Self {
        Self {
            op_id: Uuid::new_v4(),
            op,
            note,
            queued_at: Utc::now(),
        }
    }

    /// Create an "insert" entry
    pub fn insert(note: Note) -> Self {
        Self::new(OpKind::Insert, note)
    }

    /// Create an "update" entry carrying the full updated note
    pub fn update(note: Note) -> Self {
        Self::new(OpKind::Update, note)
    }

    /// Create a "delete" entry carrying the note's last known state
    pub fn delete(note: Note) -> Self {
        Self::new(OpKind::Delete, note)
    }
}
