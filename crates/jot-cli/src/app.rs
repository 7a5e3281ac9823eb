//! Application state and logic
//!
//! Wires the sync engine to the on-disk cache and the configured backend.
//! Each CLI invocation is a short-lived process, so nothing runs in the
//! background: after a mutation the queue is drained in the foreground when
//! a backend is reachable.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use jot_core::{
    ManualConnectivity, Note, NoteFields, NoteId, RemoteError, RemoteStore, UserId,
};
use jot_storage::FileLocalStore;
use jot_sync::{DrainReport, HttpRemoteStore, SyncConfig, SyncEngine, SyncReport, SyncStatus};

use crate::config::{ACCESS_TOKEN_ENV, CliConfig};

/// Stand-in remote used when no backend is configured
///
/// Connectivity is pinned offline in that case, so it is only reached by an
/// explicit drain, which then fails like an unreachable server.
#[derive(Debug, Default)]
struct NoRemote;

#[async_trait]
impl RemoteStore for NoRemote {
    async fn insert(&self, _: &UserId, _: &Note) -> Result<(), RemoteError> {
        Err(unconfigured())
    }

    async fn update(&self, _: &UserId, _: &NoteId, _: &NoteFields) -> Result<(), RemoteError> {
        Err(unconfigured())
    }

    async fn delete(&self, _: &UserId, _: &NoteId) -> Result<(), RemoteError> {
        Err(unconfigured())
    }

    async fn list_all(&self, _: &UserId) -> Result<Vec<Note>, RemoteError> {
        Err(unconfigured())
    }
}

fn unconfigured() -> RemoteError {
    RemoteError::network("no remote configured")
}

/// Options taken from the command line
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub user: Option<String>,
    pub offline: bool,
}

/// The main application state
pub struct App {
    engine: SyncEngine,
    connectivity: Arc<ManualConnectivity>,
    remote_configured: bool,
}

impl App {
    pub async fn open(config: &CliConfig, options: OpenOptions) -> anyhow::Result<Self> {
        let cache_dir = config.data_dir().join("cache");
        let local = FileLocalStore::new(&cache_dir)
            .await
            .with_context(|| format!("opening note cache at {}", cache_dir.display()))?;

        let remote: Arc<dyn RemoteStore> = match &config.remote {
            Some(section) => {
                let token = std::env::var(ACCESS_TOKEN_ENV).ok();
                Arc::new(
                    HttpRemoteStore::new(section.http_config(token))
                        .context("creating HTTP client")?,
                )
            }
            None => Arc::new(NoRemote),
        };
        let remote_configured = config.remote.is_some();

        let user = options.user.or_else(|| config.user.clone()).map(UserId::new);
        let connectivity = Arc::new(ManualConnectivity::new(
            remote_configured && !options.offline,
        ));

        let sync_config = SyncConfig {
            auto_drain: false,
            sync_on_start: false,
            sync_on_reconnect: false,
            ..config.sync.clone()
        };

        let engine = SyncEngine::new(
            user,
            Arc::new(local),
            remote,
            connectivity.clone(),
            sync_config,
        )
        .await
        .context("loading notes")?;

        Ok(Self {
            engine,
            connectivity,
            remote_configured,
        })
    }

    pub fn remote_configured(&self) -> bool {
        self.remote_configured
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.engine.notes().await
    }

    /// Find a note by id, id prefix, list position (1-based), or title
    pub async fn find_note(&self, query: &str) -> Option<Note> {
        find_note(&self.engine.notes().await, query)
    }

    pub async fn add_note(&self, title: &str, desc: &str) -> anyhow::Result<(Note, Option<DrainReport>)> {
        let note = self.engine.add_note(title, desc).await?;
        let drained = self.flush().await?;
        Ok((note, drained))
    }

    pub async fn update_note(
        &self,
        id: &NoteId,
        desc: &str,
    ) -> anyhow::Result<(Option<Note>, Option<DrainReport>)> {
        let updated = self.engine.update_note(id, desc).await?;
        let drained = match updated {
            Some(_) => self.flush().await?,
            None => None,
        };
        Ok((updated, drained))
    }

    pub async fn delete_note(&self, id: &NoteId) -> anyhow::Result<(Option<Note>, Option<DrainReport>)> {
        let removed = self.engine.delete_note(id).await?;
        let drained = match removed {
            Some(_) => self.flush().await?,
            None => None,
        };
        Ok((removed, drained))
    }

    pub async fn sync(&self) -> anyhow::Result<SyncReport> {
        Ok(self.engine.force_sync().await?)
    }

    pub async fn status(&self) -> SyncStatus {
        self.engine.status().await
    }

    /// Drain the queue in the foreground when a backend is reachable
    async fn flush(&self) -> anyhow::Result<Option<DrainReport>> {
        if !self.is_online() || self.engine.user().is_none() {
            debug!("Skipping drain, working offline");
            return Ok(None);
        }
        Ok(Some(self.engine.drain_queue().await?))
    }
}

/// Resolve a user-supplied reference to a note
pub fn find_note(notes: &[Note], query: &str) -> Option<Note> {
    if let Some(note) = notes.iter().find(|n| n.id.as_str() == query) {
        return Some(note.clone());
    }

    let by_prefix: Vec<&Note> = notes
        .iter()
        .filter(|n| n.id.as_str().starts_with(query))
        .collect();
    if let [note] = by_prefix.as_slice() {
        return Some((*note).clone());
    }

    if let Ok(index) = query.parse::<usize>()
        && index > 0
        && index <= notes.len()
    {
        return Some(notes[index - 1].clone());
    }

    let needle = query.to_lowercase();
    notes
        .iter()
        .find(|n| n.title.to_lowercase().contains(&needle))
        .cloned()
}
