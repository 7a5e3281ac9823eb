//! Configuration for the sync engine.
//!
//! Provides sensible defaults with the ability to customize behavior
//! through builder methods.

use serde::{Deserialize, Serialize};

/// How a fetched remote collection is combined with local state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Remote notes win for every id present remotely; local-only notes are
    /// appended after the remote set.
    #[default]
    RemoteWins,
    /// As `RemoteWins`, then re-apply every still-pending queue entry on top:
    /// a queued delete hides the remote copy and a queued insert or update
    /// keeps the local state.
    PreservePending,
}

/// What a drain does after a remote call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Keep the failed entry and carry on with every later entry.
    #[default]
    Independent,
    /// Keep the failed entry and skip later entries for the same note in
    /// this pass, so a note's operations are never applied out of order.
    HoldNoteOnFailure,
}

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Spawn a background drain after each local mutation while online.
    pub auto_drain: bool,
    /// Run one sync when the auto-sync task starts.
    pub sync_on_start: bool,
    /// Run one sync on every transition into the online state.
    pub sync_on_reconnect: bool,
    /// Merge behavior for fetched remote notes.
    pub merge_policy: MergePolicy,
    /// Failure behavior while draining the queue.
    pub drain_policy: DrainPolicy,
    /// Capacity of the [`SyncEvent`](crate::SyncEvent) broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_drain: true,
            sync_on_start: true,
            sync_on_reconnect: true,
            merge_policy: MergePolicy::default(),
            drain_policy: DrainPolicy::default(),
            event_channel_capacity: 256,
        }
    }
}

impl SyncConfig {
    /// Configuration for hosts that drive every sync explicitly.
    ///
    /// No background drains and no automatic syncs; useful for one-shot
    /// processes such as a CLI invocation.
    pub fn manual() -> Self {
        Self {
            auto_drain: false,
            sync_on_start: false,
            sync_on_reconnect: false,
            ..Default::default()
        }
    }

    pub fn with_auto_drain(mut self, enabled: bool) -> Self {
        self.auto_drain = enabled;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }
}
