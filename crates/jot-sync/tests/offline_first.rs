//! Offline-first behavior of the sync engine
//!
//! These tests drive a [`SyncEngine`] against the recording mock remote and
//! a manually switched connectivity monitor:
//! - Local-first visibility and queueing while offline
//! - Ordered, at-least-once replay of the queue
//! - At most one drain in flight
//! - Start and reconnect triggers
//! - Merge policies and per-user isolation

use std::sync::Arc;
use std::time::Duration;

use jot_core::{
    ManualConnectivity, MockRemoteStore, Note, OpKind, RemoteCall, RemoteError, UserId,
};
use jot_storage::{FileLocalStore, InMemoryLocalStore, LocalStore};
use jot_sync::{DrainPolicy, MergePolicy, SyncConfig, SyncEngine, SyncEvent};
use tempfile::TempDir;
use tokio::sync::broadcast;

fn alice() -> UserId {
    UserId::new("alice")
}

async fn open(
    user: Option<UserId>,
    local: Arc<dyn LocalStore>,
    remote: Arc<MockRemoteStore>,
    connectivity: Arc<ManualConnectivity>,
    config: SyncConfig,
) -> SyncEngine {
    SyncEngine::new(user, local, remote, connectivity, config)
        .await
        .unwrap()
}

async fn open_in_memory(
    online: bool,
    config: SyncConfig,
) -> (SyncEngine, Arc<MockRemoteStore>, Arc<ManualConnectivity>) {
    let remote = Arc::new(MockRemoteStore::new());
    let connectivity = Arc::new(ManualConnectivity::new(online));
    let engine = open(
        Some(alice()),
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        connectivity.clone(),
        config,
    )
    .await;
    (engine, remote, connectivity)
}

/// Wait for an event matching `pred`, failing after a few seconds
async fn wait_for(rx: &mut broadcast::Receiver<SyncEvent>, pred: impl Fn(&SyncEvent) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event");
}

async fn wait_until_drained(engine: &SyncEngine) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !engine.pending_ops().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue never drained");
}

fn applied_inserts(remote: &MockRemoteStore) -> usize {
    remote
        .applied_mutations()
        .iter()
        .filter(|c| c.kind() == Some(OpKind::Insert))
        .count()
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_offline_add_then_force_sync_delivers_once() {
    let (engine, remote, connectivity) = open_in_memory(false, SyncConfig::default()).await;

    let note = engine.add_note("Groceries", "Milk, eggs").await.unwrap();

    assert_eq!(engine.notes().await.len(), 1);
    let queue = engine.pending_ops().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].op, OpKind::Insert);
    assert!(remote.calls().is_empty());

    connectivity.set_online(true);
    let report = engine.force_sync().await.unwrap();

    assert!(report.online);
    assert!(!report.has_failures());
    assert_eq!(
        remote.applied_mutations(),
        vec![RemoteCall::Insert {
            user: alice(),
            note: note.clone()
        }]
    );
    assert!(engine.pending_ops().await.is_empty());
    assert_eq!(engine.notes().await, vec![note]);
    assert!(engine.last_sync().await.is_some());
}

// ============================================================================
// Queue replay
// ============================================================================

#[tokio::test]
async fn test_drain_replays_in_enqueue_order() {
    let (engine, remote, _) = open_in_memory(false, SyncConfig::manual()).await;

    let note = engine.add_note("Plan", "v1").await.unwrap();
    engine.update_note(&note.id, "v2").await.unwrap();
    engine.update_note(&note.id, "v3").await.unwrap();
    engine.delete_note(&note.id).await.unwrap();
    let other = engine.add_note("Other", "").await.unwrap();

    engine.drain_queue().await.unwrap();

    let calls: Vec<_> = remote
        .applied_mutations()
        .iter()
        .map(|c| (c.kind().unwrap(), c.note_id().unwrap().clone()))
        .collect();
    assert_eq!(
        calls,
        vec![
            (OpKind::Insert, note.id.clone()),
            (OpKind::Update, note.id.clone()),
            (OpKind::Update, note.id.clone()),
            (OpKind::Delete, note.id.clone()),
            (OpKind::Insert, other.id.clone()),
        ]
    );
    assert_eq!(remote.notes_for(&alice()), vec![other]);
}

#[tokio::test]
async fn test_failed_entry_retried_and_removed_once() {
    let (engine, remote, _) = open_in_memory(true, SyncConfig::manual()).await;
    engine.add_note("A", "B").await.unwrap();
    remote.fail_next(1);

    let first = engine.drain_queue().await.unwrap();
    assert_eq!(first.applied, 0);
    assert_eq!(first.failed.len(), 1);
    assert_eq!(engine.pending_ops().await.len(), 1);

    let second = engine.drain_queue().await.unwrap();
    assert_eq!(second.applied, 1);
    assert!(engine.pending_ops().await.is_empty());

    let third = engine.drain_queue().await.unwrap();
    assert_eq!(third.applied, 0);

    assert_eq!(remote.calls().len(), 2);
    assert_eq!(applied_inserts(&remote), 1);
}

#[tokio::test]
async fn test_mutations_during_drain_stay_queued() {
    let remote = Arc::new(MockRemoteStore::with_latency(Duration::from_millis(50)));
    let engine = open(
        Some(alice()),
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        Arc::new(ManualConnectivity::online()),
        SyncConfig::manual(),
    )
    .await;
    engine.add_note("Early", "").await.unwrap();

    let (report, late) = tokio::join!(engine.drain_queue(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.add_note("Late", "").await.unwrap()
    });

    let report = report.unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.remaining, 1);
    let queue = engine.pending_ops().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].note, late);
    assert_eq!(engine.notes().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_aborted_drain_keeps_delivered_entries_out_of_queue() {
    let remote = Arc::new(MockRemoteStore::with_latency(Duration::from_millis(50)));
    let engine = open(
        Some(alice()),
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        Arc::new(ManualConnectivity::online()),
        SyncConfig::manual(),
    )
    .await;
    let first = engine.add_note("First", "").await.unwrap();
    let second = engine.add_note("Second", "").await.unwrap();

    // First call answers at 50ms, the second is still in flight at 75ms
    let drain = tokio::spawn({
        let engine = engine.clone();
        async move { engine.drain_queue().await }
    });
    tokio::time::sleep(Duration::from_millis(75)).await;
    drain.abort();
    assert!(drain.await.unwrap_err().is_cancelled());

    assert_eq!(remote.notes_for(&alice()), vec![first]);
    let queue = engine.pending_ops().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].note, second);

    let report = engine.drain_queue().await.unwrap();

    assert_eq!(report.applied, 1);
    assert!(report.failed.is_empty());
    assert_eq!(report.remaining, 0);
    assert_eq!(applied_inserts(&remote), 2);
    assert!(remote.recorded().iter().all(|r| r.succeeded));
}

#[tokio::test]
async fn test_insert_already_on_remote_is_confirmed() {
    let config = SyncConfig::manual().with_drain_policy(DrainPolicy::HoldNoteOnFailure);
    let (engine, remote, _) = open_in_memory(true, config).await;
    let note = engine.add_note("Groceries", "Milk").await.unwrap();
    engine.update_note(&note.id, "Milk, eggs").await.unwrap();
    // Delivered before a crash that lost the queue write
    remote.seed(&alice(), vec![note.clone()]);

    let report = engine.drain_queue().await.unwrap();

    assert_eq!(report.applied, 2);
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped, 0);
    assert!(engine.pending_ops().await.is_empty());
    let rows = remote.notes_for(&alice());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].desc, "Milk, eggs");

    let again = engine.drain_queue().await.unwrap();
    assert_eq!(again.applied, 0);
}

// ============================================================================
// At most one drain
// ============================================================================

#[tokio::test]
async fn test_concurrent_explicit_drains_apply_each_entry_once() {
    let remote = Arc::new(MockRemoteStore::with_latency(Duration::from_millis(5)));
    let engine = open(
        Some(alice()),
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        Arc::new(ManualConnectivity::online()),
        SyncConfig::manual(),
    )
    .await;
    for i in 0..3 {
        engine.add_note(format!("Note {i}"), "").await.unwrap();
    }

    let (a, b) = tokio::join!(engine.drain_queue(), engine.drain_queue());

    assert_eq!(a.unwrap().applied + b.unwrap().applied, 3);
    assert_eq!(applied_inserts(&remote), 3);
    assert!(remote.recorded().iter().all(|r| r.succeeded));
    assert!(engine.pending_ops().await.is_empty());
}

#[tokio::test]
async fn test_background_drains_coalesce_without_double_delivery() {
    let remote = Arc::new(MockRemoteStore::with_latency(Duration::from_millis(20)));
    let engine = open(
        Some(alice()),
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        Arc::new(ManualConnectivity::online()),
        SyncConfig::default(),
    )
    .await;

    for i in 0..5 {
        engine.add_note(format!("Note {i}"), "").await.unwrap();
    }
    wait_until_drained(&engine).await;

    assert_eq!(applied_inserts(&remote), 5);
    assert!(
        remote.recorded().iter().all(|r| r.succeeded),
        "an insert was delivered twice"
    );
    assert_eq!(remote.notes_for(&alice()).len(), 5);
}

#[tokio::test]
async fn test_no_background_drain_while_offline() {
    let (engine, remote, _) = open_in_memory(false, SyncConfig::default()).await;

    engine.add_note("A", "B").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(remote.calls().is_empty());
    assert_eq!(engine.pending_ops().await.len(), 1);
}

// ============================================================================
// Triggers
// ============================================================================

#[tokio::test]
async fn test_reconnect_triggers_sync() {
    let (engine, remote, connectivity) = open_in_memory(false, SyncConfig::default()).await;
    let mut events = engine.subscribe();
    let _auto = engine.start();

    let note = engine.add_note("Offline note", "").await.unwrap();
    connectivity.set_online(true);

    wait_for(&mut events, |e| matches!(e, SyncEvent::Synced { .. })).await;

    assert!(engine.is_online());
    assert!(engine.pending_ops().await.is_empty());
    assert_eq!(remote.notes_for(&alice()), vec![note]);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_blip_during_sync_triggers_another() {
    let remote = Arc::new(MockRemoteStore::with_latency(Duration::from_millis(50)));
    let connectivity = Arc::new(ManualConnectivity::online());
    let engine = open(
        Some(alice()),
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        connectivity.clone(),
        SyncConfig::default(),
    )
    .await;
    let mut events = engine.subscribe();
    let _auto = engine.start();

    // The startup fetch is still waiting on the remote at 10ms
    tokio::time::sleep(Duration::from_millis(10)).await;
    connectivity.set_online(false);
    connectivity.set_online(true);

    wait_for(&mut events, |e| matches!(e, SyncEvent::Synced { .. })).await;
    wait_for(&mut events, |e| matches!(e, SyncEvent::Synced { .. })).await;

    let fetches = remote
        .calls()
        .iter()
        .filter(|c| matches!(c, RemoteCall::ListAll { .. }))
        .count();
    assert_eq!(fetches, 2);
    assert!(engine.is_online());
}

#[tokio::test]
async fn test_start_syncs_once_with_user() {
    let (engine, remote, _) = open_in_memory(true, SyncConfig::default()).await;
    remote.seed(&alice(), vec![Note::with_id("r1", "From elsewhere", "")]);
    let mut events = engine.subscribe();

    let auto = engine.start();
    wait_for(&mut events, |e| matches!(e, SyncEvent::Synced { .. })).await;

    assert!(auto.is_running());
    assert_eq!(engine.notes().await, vec![Note::with_id("r1", "From elsewhere", "")]);
}

#[tokio::test]
async fn test_going_offline_is_reported() {
    let (engine, _, connectivity) = open_in_memory(true, SyncConfig::manual()).await;
    let mut events = engine.subscribe();
    let _auto = engine.start();

    connectivity.set_online(false);

    wait_for(&mut events, |e| {
        matches!(e, SyncEvent::ConnectivityChanged { online: false })
    })
    .await;
    assert!(!engine.is_online());
}

// ============================================================================
// Failure reporting
// ============================================================================

#[tokio::test]
async fn test_explicit_sync_surfaces_failures() {
    let (engine, remote, _) = open_in_memory(true, SyncConfig::manual()).await;
    let mut events = engine.subscribe();
    let note = engine.add_note("Kept locally", "").await.unwrap();
    remote.set_unreachable(true);

    let report = engine.force_sync().await.unwrap();

    assert!(report.has_failures());
    assert!(matches!(report.fetch_error, Some(RemoteError::Network(_))));
    assert!(report.synced_at.is_none());
    assert_eq!(engine.notes().await, vec![note.clone()]);
    assert_eq!(engine.pending_ops().await.len(), 1);
    wait_for(&mut events, |e| {
        matches!(e, SyncEvent::RemoteFailure { explicit: true, note_id, .. } if *note_id == note.id)
    })
    .await;
}

// ============================================================================
// Drain and merge policies
// ============================================================================

#[tokio::test]
async fn test_independent_policy_attempts_later_entries_for_same_note() {
    let (engine, remote, _) = open_in_memory(true, SyncConfig::manual()).await;
    let note = engine.add_note("A", "v1").await.unwrap();
    engine.update_note(&note.id, "v2").await.unwrap();
    remote.fail_next(1);

    let report = engine.drain_queue().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.applied, 1);
    let queue = engine.pending_ops().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].op, OpKind::Insert);
}

#[tokio::test]
async fn test_hold_policy_skips_later_entries_for_failed_note() {
    let config = SyncConfig::manual().with_drain_policy(DrainPolicy::HoldNoteOnFailure);
    let (engine, remote, _) = open_in_memory(true, config).await;
    let held = engine.add_note("Held", "v1").await.unwrap();
    engine.update_note(&held.id, "v2").await.unwrap();
    let other = engine.add_note("Other", "").await.unwrap();
    remote.fail_next(1);

    let report = engine.drain_queue().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.applied, 1);
    let kinds: Vec<_> = engine.pending_ops().await.iter().map(|op| op.op).collect();
    assert_eq!(kinds, vec![OpKind::Insert, OpKind::Update]);
    assert_eq!(remote.notes_for(&alice()), vec![other]);

    let retry = engine.drain_queue().await.unwrap();
    assert_eq!(retry.applied, 2);
    assert_eq!(
        remote.notes_for(&alice()).iter().find(|n| n.id == held.id).unwrap().desc,
        "v2"
    );
}

#[tokio::test]
async fn test_remote_wins_resurrects_pending_delete() {
    let (engine, remote, _) = open_in_memory(true, SyncConfig::manual()).await;
    let shared = Note::with_id("shared", "Shared", "");
    remote.seed(&alice(), vec![shared.clone()]);
    engine.fetch_remote().await.unwrap();

    remote.reject_note(&shared.id);
    engine.delete_note(&shared.id).await.unwrap();
    engine.drain_queue().await.unwrap();
    engine.fetch_remote().await.unwrap();

    assert_eq!(engine.notes().await, vec![shared]);
}

#[tokio::test]
async fn test_preserve_pending_keeps_local_delete() {
    let config = SyncConfig::manual().with_merge_policy(MergePolicy::PreservePending);
    let (engine, remote, _) = open_in_memory(true, config).await;
    let shared = Note::with_id("shared", "Shared", "");
    remote.seed(&alice(), vec![shared.clone()]);
    engine.fetch_remote().await.unwrap();

    remote.reject_note(&shared.id);
    engine.delete_note(&shared.id).await.unwrap();
    engine.drain_queue().await.unwrap();
    engine.fetch_remote().await.unwrap();

    assert!(engine.notes().await.is_empty());
    assert_eq!(engine.pending_ops().await.len(), 1);
}

// ============================================================================
// Identity and persistence
// ============================================================================

#[tokio::test]
async fn test_without_user_engine_stays_local() {
    let remote = Arc::new(MockRemoteStore::new());
    let engine = open(
        None,
        Arc::new(InMemoryLocalStore::new()),
        remote.clone(),
        Arc::new(ManualConnectivity::online()),
        SyncConfig::default(),
    )
    .await;

    engine.add_note("Local only", "").await.unwrap();
    let drain = engine.drain_queue().await.unwrap();
    let fetched = engine.fetch_remote().await.unwrap();
    let report = engine.force_sync().await.unwrap();

    assert_eq!(drain.applied, 0);
    assert!(fetched.is_none());
    assert!(report.synced_at.is_none());
    assert!(remote.calls().is_empty());
    assert_eq!(engine.notes().await.len(), 1);
    assert_eq!(engine.pending_ops().await.len(), 1);
}

#[tokio::test]
async fn test_restart_reloads_notes_and_queue() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(MockRemoteStore::new());
    let connectivity = Arc::new(ManualConnectivity::offline());

    {
        let local = Arc::new(FileLocalStore::new(temp.path()).await.unwrap());
        let engine = open(
            Some(alice()),
            local,
            remote.clone(),
            connectivity.clone(),
            SyncConfig::manual(),
        )
        .await;
        let note = engine.add_note("Survives", "restart").await.unwrap();
        engine.add_note("Second", "").await.unwrap();
        engine.update_note(&note.id, "restarted").await.unwrap();
    }

    let local = Arc::new(FileLocalStore::new(temp.path()).await.unwrap());
    let engine = open(
        Some(alice()),
        local,
        remote.clone(),
        connectivity.clone(),
        SyncConfig::manual(),
    )
    .await;

    assert_eq!(engine.notes().await.len(), 2);
    assert_eq!(engine.pending_ops().await.len(), 3);

    connectivity.set_online(true);
    engine.force_sync().await.unwrap();

    assert!(engine.pending_ops().await.is_empty());
    let remote_notes = remote.notes_for(&alice());
    assert_eq!(remote_notes.len(), 2);
    assert!(remote_notes.iter().any(|n| n.desc == "restarted"));
}

#[tokio::test]
async fn test_users_do_not_share_cache() {
    let local: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
    let remote = Arc::new(MockRemoteStore::new());
    let connectivity = Arc::new(ManualConnectivity::offline());

    let alice_engine = open(
        Some(alice()),
        local.clone(),
        remote.clone(),
        connectivity.clone(),
        SyncConfig::manual(),
    )
    .await;
    alice_engine.add_note("Private", "").await.unwrap();

    let bob_engine = open(
        Some(UserId::new("bob")),
        local.clone(),
        remote.clone(),
        connectivity.clone(),
        SyncConfig::manual(),
    )
    .await;

    assert!(bob_engine.notes().await.is_empty());
    assert!(bob_engine.pending_ops().await.is_empty());
}

#[tokio::test]
async fn test_offline_sync_reloads_cross_process_changes() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(MockRemoteStore::new());
    let connectivity = Arc::new(ManualConnectivity::offline());

    let reader = open(
        Some(alice()),
        Arc::new(FileLocalStore::new(temp.path()).await.unwrap()),
        remote.clone(),
        connectivity.clone(),
        SyncConfig::manual(),
    )
    .await;
    let writer = open(
        Some(alice()),
        Arc::new(FileLocalStore::new(temp.path()).await.unwrap()),
        remote.clone(),
        connectivity.clone(),
        SyncConfig::manual(),
    )
    .await;

    let note = writer.add_note("From another process", "").await.unwrap();
    assert!(reader.notes().await.is_empty());

    let report = reader.force_sync().await.unwrap();

    assert!(!report.online);
    assert_eq!(reader.notes().await, vec![note]);
    assert!(reader.pending_ops().await.is_empty());
}
