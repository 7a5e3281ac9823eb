//! The offline-first sync engine.
//!
//! [`SyncEngine`] owns the in-memory note collection and the pending queue.
//! Every mutation is applied locally and persisted before it returns; the
//! remote store is only ever reached by draining the queue and by fetching.
//!
//! ## Concurrency
//!
//! Engine state sits behind one async `RwLock`. Mutations hold the write
//! lock across local persistence, so the store and memory converge before
//! the next mutation runs. Remote calls are made without the lock held,
//! which lets new mutations queue up while a drain is in flight.
//!
//! At most one drain runs per engine. Background drains that find one
//! already running set a single-slot pending token and return at once; the
//! running drain re-runs before releasing. Explicit drains wait their turn.
//!
//! Each delivered entry is removed from the queue, and the queue saved, as
//! soon as its remote call succeeds, so a drain that is cancelled or cut
//! short by a crash only replays what was not yet confirmed. A replayed
//! insert that finds its row already present counts as delivered.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, instrument, warn};

use jot_core::{
    ConnectivityMonitor, Note, NoteId, OpKind, QueueOp, RemoteError, RemoteStore, UserId,
};
use jot_storage::{LocalStore, Namespace, NoteCache};

use crate::auto_sync::{self, AutoSync};
use crate::config::{DrainPolicy, MergePolicy, SyncConfig};
use crate::error::{Result, SyncError};
use crate::events::SyncEvent;
use crate::merge::{dedup_by_id, merge_remote, overlay_pending};
use crate::pending::PendingQueue;
use crate::report::{DrainReport, FailedOp, MergeSummary, SyncReport, SyncStatus, SyncTrigger};

/// How a drain was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainRequest {
    /// Fired after a local mutation; coalesces into a running drain
    Opportunistic,
    /// Part of an automatic sync; waits for a running drain
    Automatic,
    /// Asked for by the user; waits, and failures are shown
    Explicit,
}

impl DrainRequest {
    fn waits(self) -> bool {
        !matches!(self, Self::Opportunistic)
    }

    fn is_explicit(self) -> bool {
        matches!(self, Self::Explicit)
    }
}

struct EngineState {
    notes: Vec<Note>,
    queue: PendingQueue,
    last_sync: Option<DateTime<Utc>>,
}

struct EngineInner {
    user: Option<UserId>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    cache: NoteCache,
    config: SyncConfig,
    state: RwLock<EngineState>,
    online: AtomicBool,
    drain_lock: Mutex<()>,
    drain_pending: AtomicBool,
    event_tx: broadcast::Sender<SyncEvent>,
}

/// Offline-first note store with a background-drained mutation queue
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Open an engine for `user`, loading the cached notes and queue first
    ///
    /// Without a user the engine works purely locally against the device
    /// namespace and never touches the remote store.
    #[instrument(skip_all, fields(user = ?user.as_ref().map(UserId::as_str)))]
    pub async fn new(
        user: Option<UserId>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: SyncConfig,
    ) -> Result<Self> {
        let cache = NoteCache::new(local, Namespace::for_user(user.as_ref()));

        let loaded = cache.load_notes().await?;
        let loaded_len = loaded.len();
        let notes = dedup_by_id(loaded);
        if notes.len() != loaded_len {
            warn!(
                dropped = loaded_len - notes.len(),
                "Cached notes contained duplicate ids"
            );
        }
        let queue = PendingQueue::from_entries(cache.load_queue().await?);
        let online = connectivity.current_status().await.online;

        info!(
            notes = notes.len(),
            pending = queue.len(),
            online,
            "Sync engine opened"
        );

        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Ok(Self {
            inner: Arc::new(EngineInner {
                user,
                remote,
                connectivity,
                cache,
                config,
                state: RwLock::new(EngineState {
                    notes,
                    queue,
                    last_sync: None,
                }),
                online: AtomicBool::new(online),
                drain_lock: Mutex::new(()),
                drain_pending: AtomicBool::new(false),
                event_tx,
            }),
        })
    }

    /// Spawn the start/reconnect trigger task
    ///
    /// Must be called from within a Tokio runtime. The task stops when the
    /// returned guard is dropped.
    pub fn start(&self) -> AutoSync {
        let rx = self.inner.connectivity.subscribe();
        auto_sync::spawn(self.clone(), rx)
    }

    // ============================================================
    // Accessors
    // ============================================================

    /// Snapshot of the current note collection
    pub async fn notes(&self) -> Vec<Note> {
        self.inner.state.read().await.notes.clone()
    }

    /// Look up a single note by id
    pub async fn get_note(&self, id: &NoteId) -> Option<Note> {
        self.inner
            .state
            .read()
            .await
            .notes
            .iter()
            .find(|n| &n.id == id)
            .cloned()
    }

    /// Snapshot of the pending queue in enqueue order
    pub async fn pending_ops(&self) -> Vec<QueueOp> {
        self.inner.state.read().await.queue.to_vec()
    }

    /// Last connectivity value the engine has seen
    ///
    /// Updated by the auto-sync task and at the start of every sync.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Time of the last sync whose fetch succeeded
    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_sync
    }

    /// The signed-in user; `None` means local-only
    pub fn user(&self) -> Option<&UserId> {
        self.inner.user.as_ref()
    }

    /// Configuration the engine was opened with
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Connectivity, queue depth and last sync time in one snapshot
    pub async fn status(&self) -> SyncStatus {
        let state = self.inner.state.read().await;
        SyncStatus {
            online: self.is_online(),
            pending_ops: state.queue.len(),
            last_sync: state.last_sync,
            note_count: state.notes.len(),
            user: self.inner.user.clone(),
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.event_tx.subscribe()
    }

    // ============================================================
    // Mutations
    // ============================================================

    /// Create a note with a fresh random id
    ///
    /// Returns once the note and its queue entry are persisted locally.
    pub async fn add_note(
        &self,
        title: impl Into<String>,
        desc: impl Into<String>,
    ) -> Result<Note> {
        let note = Note::new(title, desc);
        {
            let mut state = self.inner.state.write().await;
            state.notes.push(note.clone());
            self.inner.cache.save_notes(&state.notes).await?;
            state.queue.push(QueueOp::insert(note.clone()));
            self.inner.cache.save_queue(state.queue.as_slice()).await?;
        }
        debug!(note_id = %note.id, "Note added");

        self.emit(SyncEvent::NotesChanged);
        self.schedule_drain();
        Ok(note)
    }

    /// Replace a note's description, keeping its title
    ///
    /// An unknown id is ignored and yields `Ok(None)`.
    pub async fn update_note(&self, id: &NoteId, desc: impl Into<String>) -> Result<Option<Note>> {
        let updated = {
            let mut state = self.inner.state.write().await;
            let Some(note) = state.notes.iter_mut().find(|n| &n.id == id) else {
                debug!(note_id = %id, "Update for unknown note ignored");
                return Ok(None);
            };
            note.desc = desc.into();
            let updated = note.clone();

            self.inner.cache.save_notes(&state.notes).await?;
            state.queue.push(QueueOp::update(updated.clone()));
            self.inner.cache.save_queue(state.queue.as_slice()).await?;
            updated
        };
        debug!(note_id = %id, "Note updated");

        self.emit(SyncEvent::NotesChanged);
        self.schedule_drain();
        Ok(Some(updated))
    }

    /// Remove a note, queueing a remote delete carrying its last state
    ///
    /// An unknown id is ignored and queues nothing.
    pub async fn delete_note(&self, id: &NoteId) -> Result<Option<Note>> {
        let removed = {
            let mut state = self.inner.state.write().await;
            let Some(pos) = state.notes.iter().position(|n| &n.id == id) else {
                debug!(note_id = %id, "Delete for unknown note ignored");
                return Ok(None);
            };
            let removed = state.notes.remove(pos);

            self.inner.cache.save_notes(&state.notes).await?;
            state.queue.push(QueueOp::delete(removed.clone()));
            self.inner.cache.save_queue(state.queue.as_slice()).await?;
            removed
        };
        debug!(note_id = %id, "Note deleted");

        self.emit(SyncEvent::NotesChanged);
        self.schedule_drain();
        Ok(Some(removed))
    }

    // ============================================================
    // Sync
    // ============================================================

    /// Replay the pending queue against the remote store
    ///
    /// Waits for a drain already in flight, then runs its own pass. Remote
    /// failures are reported, never returned as errors.
    pub async fn drain_queue(&self) -> Result<DrainReport> {
        self.drain(DrainRequest::Explicit).await
    }

    /// Fetch the user's remote notes and merge them into the collection
    ///
    /// Returns `Ok(None)` without a user.
    #[instrument(skip(self), fields(user = ?self.user().map(UserId::as_str)))]
    pub async fn fetch_remote(&self) -> Result<Option<MergeSummary>> {
        let Some(user) = self.inner.user.as_ref() else {
            return Ok(None);
        };

        let remote = dedup_by_id(self.inner.remote.list_all(user).await?);
        let remote_count = remote.len();

        let summary = {
            let mut state = self.inner.state.write().await;
            let merged = merge_remote(&state.notes, remote);
            let local_only = merged.len() - remote_count;
            let merged = match self.inner.config.merge_policy {
                MergePolicy::RemoteWins => merged,
                MergePolicy::PreservePending => overlay_pending(merged, state.queue.as_slice()),
            };

            self.inner.cache.save_notes(&merged).await?;
            state.notes = merged;
            MergeSummary {
                remote: remote_count,
                local_only,
                total: state.notes.len(),
            }
        };
        debug!(
            remote = summary.remote,
            local_only = summary.local_only,
            "Merged remote notes"
        );

        self.emit(SyncEvent::NotesChanged);
        Ok(Some(summary))
    }

    /// Run a full sync: drain then fetch when online, reload when offline
    #[instrument(skip(self), fields(user = ?self.user().map(UserId::as_str)))]
    pub async fn sync_now(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        let online = self.inner.connectivity.current_status().await.online;
        self.set_online(online);

        if !online {
            debug!("Offline, reloading local cache");
            self.reload_local().await?;
            return Ok(SyncReport::offline(trigger));
        }

        let request = if trigger.is_explicit() {
            DrainRequest::Explicit
        } else {
            DrainRequest::Automatic
        };
        let drain = self.drain(request).await?;

        let (fetched, fetch_error) = match self.fetch_remote().await {
            Ok(summary) => (summary, None),
            Err(SyncError::Remote(error)) => {
                if trigger.is_explicit() {
                    warn!(error = %error, "Remote fetch failed");
                } else {
                    debug!(error = %error, "Remote fetch failed");
                }
                (None, Some(error))
            }
            Err(e) => return Err(e),
        };

        let synced_at = if fetched.is_some() {
            let now = Utc::now();
            self.inner.state.write().await.last_sync = Some(now);
            self.emit(SyncEvent::Synced { at: now });
            Some(now)
        } else {
            None
        };

        info!(
            applied = drain.applied,
            failed = drain.failed.len(),
            remaining = drain.remaining,
            synced = synced_at.is_some(),
            "Sync finished"
        );

        Ok(SyncReport {
            trigger,
            online,
            drain: Some(drain),
            fetched,
            fetch_error,
            synced_at,
        })
    }

    /// A sync requested by the user
    pub async fn force_sync(&self) -> Result<SyncReport> {
        self.sync_now(SyncTrigger::Manual).await
    }

    /// Replace the in-memory collection with the persisted one
    ///
    /// The queue is left untouched.
    pub async fn reload_local(&self) -> Result<()> {
        let notes = dedup_by_id(self.inner.cache.load_notes().await?);
        self.inner.state.write().await.notes = notes;
        self.emit(SyncEvent::NotesChanged);
        Ok(())
    }

    // ============================================================
    // Internals
    // ============================================================

    /// Record a connectivity value; returns whether it changed
    pub(crate) fn set_online(&self, online: bool) -> bool {
        let was = self.inner.online.swap(online, Ordering::SeqCst);
        if was != online {
            info!(online, "Connectivity changed");
            self.emit(SyncEvent::ConnectivityChanged { online });
            true
        } else {
            false
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.inner.event_tx.send(event);
    }

    fn schedule_drain(&self) {
        if !self.inner.config.auto_drain || self.inner.user.is_none() || !self.is_online() {
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.drain(DrainRequest::Opportunistic).await {
                warn!(error = %e, "Background drain failed");
            }
        });
    }

    #[instrument(skip(self), fields(user = ?self.user().map(UserId::as_str)))]
    async fn drain(&self, request: DrainRequest) -> Result<DrainReport> {
        let Some(user) = self.inner.user.as_ref() else {
            return Ok(DrainReport::default());
        };

        let mut guard = if request.waits() {
            self.inner.drain_lock.lock().await
        } else {
            // Raise the token before trying, so a holder that is about to
            // release either sees it or has already released
            self.inner.drain_pending.store(true, Ordering::SeqCst);
            match self.inner.drain_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Drain already running, request coalesced");
                    return Ok(DrainReport::coalesced());
                }
            }
        };

        let mut report = DrainReport::default();
        loop {
            self.inner.drain_pending.store(false, Ordering::SeqCst);
            report.absorb(self.drain_pass(user, request.is_explicit()).await?);
            drop(guard);

            if !self.inner.drain_pending.load(Ordering::SeqCst) {
                break;
            }
            guard = match self.inner.drain_lock.try_lock() {
                Ok(guard) => guard,
                // Whoever holds it now clears the token and runs a pass
                Err(_) => break,
            };
            debug!("Re-running drain for coalesced request");
        }
        Ok(report)
    }

    async fn drain_pass(&self, user: &UserId, explicit: bool) -> Result<DrainReport> {
        let snapshot = self.inner.state.read().await.queue.to_vec();
        let mut report = DrainReport {
            passes: 1,
            ..Default::default()
        };
        if snapshot.is_empty() {
            return Ok(report);
        }

        let hold_on_failure = self.inner.config.drain_policy == DrainPolicy::HoldNoteOnFailure;
        let mut held: HashSet<NoteId> = HashSet::new();

        for entry in snapshot {
            if hold_on_failure && held.contains(&entry.note.id) {
                report.skipped += 1;
                continue;
            }

            match self.apply(user, &entry).await {
                Ok(()) => {
                    self.confirm(&entry).await?;
                    report.applied += 1;
                }
                // Ids are generated locally, so an existing row is our own
                // earlier delivery whose confirmation was lost
                Err(RemoteError::Conflict(reason)) if entry.op == OpKind::Insert => {
                    debug!(note_id = %entry.note.id, reason = %reason, "Insert already applied remotely");
                    self.confirm(&entry).await?;
                    report.applied += 1;
                }
                Err(error) => {
                    if explicit {
                        warn!(op = %entry.op, note_id = %entry.note.id, error = %error, "Remote call failed, keeping entry");
                    } else {
                        debug!(op = %entry.op, note_id = %entry.note.id, error = %error, "Remote call failed, keeping entry");
                    }
                    self.emit(SyncEvent::RemoteFailure {
                        op: entry.op,
                        note_id: entry.note.id.clone(),
                        error: error.clone(),
                        explicit,
                    });
                    held.insert(entry.note.id.clone());
                    report.failed.push(FailedOp {
                        op_id: entry.op_id,
                        op: entry.op,
                        note_id: entry.note.id,
                        error,
                    });
                }
            }
        }

        report.remaining = self.inner.state.read().await.queue.len();
        Ok(report)
    }

    /// Drop a delivered entry from the queue and persist the queue
    ///
    /// Runs per entry so a drain cut short keeps what it already delivered.
    async fn confirm(&self, entry: &QueueOp) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if state.queue.remove(&entry.op_id) {
            self.inner.cache.save_queue(state.queue.as_slice()).await?;
        }
        Ok(())
    }

    async fn apply(&self, user: &UserId, entry: &QueueOp) -> std::result::Result<(), RemoteError> {
        let remote = &self.inner.remote;
        match entry.op {
            OpKind::Insert => remote.insert(user, &entry.note).await,
            OpKind::Update => {
                remote
                    .update(user, &entry.note.id, &entry.note.fields())
                    .await
            }
            OpKind::Delete => remote.delete(user, &entry.note.id).await,
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("user", &self.inner.user)
            .field("online", &self.is_online())
            .field("namespace", self.inner.cache.namespace())
            .finish_non_exhaustive()
    }
}
