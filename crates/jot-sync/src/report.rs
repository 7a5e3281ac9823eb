//! Outcome types returned by drains, fetches, and syncs.

use chrono::{DateTime, Utc};
use jot_core::{NoteId, OpKind, RemoteError, UserId};
use uuid::Uuid;

/// Why a sync is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SyncTrigger {
    /// Engine start with a known user
    #[display("startup")]
    Startup,
    /// The connectivity monitor reported a transition into the online state
    #[display("reconnect")]
    Reconnect,
    /// The user asked for it
    #[display("manual")]
    Manual,
}

impl SyncTrigger {
    /// Whether failures should be shown to the user
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

/// A queue entry whose remote call failed; the entry stays queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOp {
    pub op_id: Uuid,
    pub op: OpKind,
    pub note_id: NoteId,
    pub error: RemoteError,
}

/// Result of draining the pending queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries confirmed by the remote store and removed from the queue
    pub applied: usize,
    /// Entries whose remote call failed
    pub failed: Vec<FailedOp>,
    /// Entries not attempted because an earlier entry for the same note
    /// failed in the same pass
    pub skipped: usize,
    /// Queue length after the last pass
    pub remaining: usize,
    /// Number of passes run (a coalesced request can add a pass)
    pub passes: usize,
    /// Another drain was already running; it will pick up this request
    pub coalesced: bool,
}

impl DrainReport {
    pub(crate) fn coalesced() -> Self {
        Self {
            coalesced: true,
            ..Default::default()
        }
    }

    /// Fold a later pass into this report
    pub(crate) fn absorb(&mut self, pass: DrainReport) {
        self.applied += pass.applied;
        self.failed.extend(pass.failed);
        self.skipped += pass.skipped;
        self.remaining = pass.remaining;
        self.passes += pass.passes;
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Shape of a merged collection after a fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Notes taken from the remote store
    pub remote: usize,
    /// Local notes absent remotely, kept after the remote set
    pub local_only: usize,
    /// Size of the resulting collection
    pub total: usize,
}

/// Result of [`SyncEngine::sync_now`](crate::SyncEngine::sync_now)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    /// Connectivity observed when the sync started
    pub online: bool,
    /// Drain outcome; `None` when offline
    pub drain: Option<DrainReport>,
    /// Fetch outcome; `None` when offline, without a user, or when the
    /// fetch failed
    pub fetched: Option<MergeSummary>,
    pub fetch_error: Option<RemoteError>,
    /// Set when the fetch succeeded and the last-sync time was stamped
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub(crate) fn offline(trigger: SyncTrigger) -> Self {
        Self {
            trigger,
            online: false,
            drain: None,
            fetched: None,
            fetch_error: None,
            synced_at: None,
        }
    }

    /// Every remote error seen during this sync, drain failures first
    pub fn remote_errors(&self) -> Vec<&RemoteError> {
        self.drain
            .iter()
            .flat_map(|d| d.failed.iter().map(|f| &f.error))
            .chain(self.fetch_error.iter())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.remote_errors().is_empty()
    }
}

/// Point-in-time summary of engine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub online: bool,
    pub pending_ops: usize,
    pub last_sync: Option<DateTime<Utc>>,
    pub note_count: usize,
    pub user: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(id: &str) -> FailedOp {
        FailedOp {
            op_id: Uuid::new_v4(),
            op: OpKind::Insert,
            note_id: NoteId::new(id),
            error: RemoteError::network("unreachable"),
        }
    }

    #[test]
    fn test_absorb_accumulates() {
        let mut report = DrainReport {
            applied: 2,
            failed: vec![failed("a")],
            remaining: 1,
            passes: 1,
            ..Default::default()
        };
        report.absorb(DrainReport {
            applied: 1,
            skipped: 1,
            remaining: 0,
            passes: 1,
            ..Default::default()
        });

        assert_eq!(report.applied, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.remaining, 0);
        assert_eq!(report.passes, 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_sync_report_collects_errors() {
        let mut report = SyncReport::offline(SyncTrigger::Manual);
        assert!(!report.has_failures());

        report.drain = Some(DrainReport {
            failed: vec![failed("a")],
            ..Default::default()
        });
        report.fetch_error = Some(RemoteError::unauthorized("expired"));

        assert_eq!(report.remote_errors().len(), 2);
    }

    #[test]
    fn test_only_manual_is_explicit() {
        assert!(SyncTrigger::Manual.is_explicit());
        assert!(!SyncTrigger::Startup.is_explicit());
        assert!(!SyncTrigger::Reconnect.is_explicit());
        assert_eq!(SyncTrigger::Reconnect.to_string(), "reconnect");
    }
}
