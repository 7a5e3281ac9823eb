//! Reconciliation of a fetched remote collection with local state.

use std::collections::HashSet;

use jot_core::{Note, NoteId, OpKind, QueueOp};

/// Merge a fetched remote collection into the local one.
///
/// Remote notes win for every id present remotely and keep the remote order.
/// Local notes whose id is absent remotely are appended after the remote set
/// in their local order. An id absent remotely cannot be told apart from one
/// deleted by another client, so such notes are kept.
pub fn merge_remote(local: &[Note], remote: Vec<Note>) -> Vec<Note> {
    let mut merged = dedup_by_id(remote);
    let remote_ids: HashSet<NoteId> = merged.iter().map(|n| n.id.clone()).collect();

    merged.extend(
        local
            .iter()
            .filter(|n| !remote_ids.contains(&n.id))
            .cloned(),
    );
    merged
}

/// Re-apply still-pending queue entries on top of a merged collection.
///
/// Entries are replayed in queue order: a queued delete acts as a tombstone
/// and hides the note, a queued insert or update restores the local state
/// (appending it if the note is missing).
pub fn overlay_pending(mut notes: Vec<Note>, queue: &[QueueOp]) -> Vec<Note> {
    for entry in queue {
        let position = notes.iter().position(|n| n.id == entry.note.id);
        match (entry.op, position) {
            (OpKind::Delete, Some(i)) => {
                notes.remove(i);
            }
            (OpKind::Delete, None) => {}
            (OpKind::Insert | OpKind::Update, Some(i)) => notes[i] = entry.note.clone(),
            (OpKind::Insert | OpKind::Update, None) => notes.push(entry.note.clone()),
        }
    }
    notes
}

/// Drop later duplicates of an id, keeping the first occurrence.
pub fn dedup_by_id(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    notes
        .into_iter()
        .filter(|n| seen.insert(n.id.clone()))
        .collect()
}
