//! Typed access to the note and queue slots of one namespace

use std::sync::Arc;

use jot_core::{Note, QueueOp};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::LocalStore;
use crate::error::StorageError;
use crate::keys::{Namespace, Slot, SlotKey};

/// The note cache and pending queue of a single namespace
///
/// Both collections are stored as JSON arrays and always written whole.
/// The two slots are independent: a crash between saving notes and saving
/// the queue can leave them out of step.
///
/// A corrupt notes slot is logged and read as empty, since every note not
/// yet on the remote still has its queued mutation. A corrupt queue slot is
/// an error: starting empty would let the next save erase unsent changes.
#[derive(Clone)]
pub struct NoteCache {
    store: Arc<dyn LocalStore>,
    namespace: Namespace,
}

impl NoteCache {
    pub fn new(store: Arc<dyn LocalStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn key(&self, slot: Slot) -> SlotKey {
        SlotKey::new(self.namespace.clone(), slot)
    }

    /// Load the note collection; an empty or unreadable slot yields `[]`
    pub async fn load_notes(&self) -> Result<Vec<Note>, StorageError> {
        self.load_slot(Slot::Notes).await
    }

    /// Replace the persisted note collection
    pub async fn save_notes(&self, notes: &[Note]) -> Result<(), StorageError> {
        self.save_slot(Slot::Notes, notes).await
    }

    /// Load the pending queue in insertion order
    ///
    /// Fails with [`StorageError::Serialization`] if the slot is corrupt.
    pub async fn load_queue(&self) -> Result<Vec<QueueOp>, StorageError> {
        self.load_slot(Slot::Queue).await
    }

    /// Replace the persisted pending queue
    pub async fn save_queue(&self, queue: &[QueueOp]) -> Result<(), StorageError> {
        self.save_slot(Slot::Queue, queue).await
    }

    /// Remove both slots of this namespace
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key(Slot::Notes)).await?;
        self.store.remove(&self.key(Slot::Queue)).await
    }

    async fn load_slot<T: DeserializeOwned>(&self, slot: Slot) -> Result<Vec<T>, StorageError> {
        let key = self.key(slot);
        let Some(bytes) = self.store.read(&key).await? else {
            debug!(key = %key, "No existing slot, starting fresh");
            return Ok(Vec::new());
        };

        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(items),
            Err(e) if slot == Slot::Notes => {
                warn!(key = %key, error = %e, "Failed to parse slot, ignoring contents");
                Ok(Vec::new())
            }
            Err(e) => Err(StorageError::serialization(format!("{}: {}", key, e))),
        }
    }

    async fn save_slot<T: Serialize>(&self, slot: Slot, items: &[T]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(items)?;
        self.store.write(&self.key(slot), &bytes).await
    }
}

impl std::fmt::Debug for NoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
