//! In-memory pending-operation queue.

use jot_core::{NoteId, QueueOp};
use uuid::Uuid;

/// Ordered queue of mutations awaiting remote confirmation.
///
/// Entries keep insertion order. Removal is by entry id, so a drain working
/// from a snapshot can drop each entry as it is confirmed while new entries
/// are appended behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingQueue {
    entries: Vec<QueueOp>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<QueueOp>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, op: QueueOp) {
        self.entries.push(op);
    }

    /// Remove the entry with id `op_id`; returns whether it was present
    pub fn remove(&mut self, op_id: &Uuid) -> bool {
        match self.entries.iter().position(|op| &op.op_id == op_id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[QueueOp] {
        &self.entries
    }

    pub fn to_vec(&self) -> Vec<QueueOp> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry targets `id`
    pub fn has_pending_for(&self, id: &NoteId) -> bool {
        self.entries.iter().any(|op| &op.note.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jot_core::Note;

    #[test]
    fn test_remove_keeps_order_of_rest() {
        let note = Note::new("T", "D");
        let a = QueueOp::insert(note.clone());
        let b = QueueOp::update(note.clone());
        let c = QueueOp::delete(note.clone());
        let mut queue = PendingQueue::from_entries(vec![a.clone(), b.clone(), c.clone()]);

        assert!(queue.remove(&b.op_id));
        assert!(!queue.remove(&b.op_id));

        assert_eq!(queue.as_slice(), &[a, c]);
        assert!(queue.has_pending_for(&note.id));
    }

    #[test]
    fn test_entries_appended_after_snapshot_survive() {
        let mut queue = PendingQueue::new();
        queue.push(QueueOp::insert(Note::new("A", "")));
        let snapshot = queue.to_vec();

        let late = QueueOp::insert(Note::new("B", ""));
        queue.push(late.clone());

        for op in &snapshot {
            queue.remove(&op.op_id);
        }

        assert_eq!(queue.as_slice(), &[late]);
    }
}
