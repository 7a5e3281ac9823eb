//! # Jot Sync
//!
//! Offline-first sync engine for Jot notes.
//!
//! The engine keeps the user's notes in memory, persists every change to a
//! local store before returning, and records each change in a pending queue.
//! When the device is online the queue is replayed against the remote store
//! in order and the remote collection is fetched and merged back in.
//!
//! ## Features
//!
//! - **SyncEngine**: Local-first mutations, queue drain, fetch and merge
//! - **AutoSync**: Runs a sync on start and on every reconnect
//! - **SyncEvent**: Broadcast notifications for presentation code
//! - **HttpRemoteStore** (feature `http`): PostgREST-style remote store
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jot_core::{ManualConnectivity, MockRemoteStore, UserId};
//! use jot_storage::InMemoryLocalStore;
//! use jot_sync::{SyncConfig, SyncEngine};
//!
//! let engine = SyncEngine::new(
//!     Some(UserId::new("alice")),
//!     Arc::new(InMemoryLocalStore::new()),
//!     Arc::new(MockRemoteStore::new()),
//!     Arc::new(ManualConnectivity::online()),
//!     SyncConfig::default(),
//! )
//! .await?;
//!
//! let _auto = engine.start();
//! engine.add_note("Groceries", "Milk, eggs").await?;
//! engine.force_sync().await?;
//! ```

pub mod auto_sync;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
#[cfg(feature = "http")]
pub mod http;
pub mod merge;
pub mod pending;
pub mod report;

// Re-exports
pub use auto_sync::AutoSync;
pub use config::{DrainPolicy, MergePolicy, SyncConfig};
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use events::SyncEvent;
#[cfg(feature = "http")]
pub use http::{HttpRemoteConfig, HttpRemoteStore};
pub use merge::merge_remote;
pub use pending::PendingQueue;
pub use report::{DrainReport, FailedOp, MergeSummary, SyncReport, SyncStatus, SyncTrigger};
