//! In-memory storage implementation
//!
//! Suitable for tests and for hosts that provide no durable storage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::LocalStore;
use crate::error::StorageError;
use crate::keys::SlotKey;

/// In-memory implementation of [`LocalStore`]
///
/// Uses `DashMap` for concurrent access. Writes can be made to fail on
/// demand to exercise local persistence failures.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    slots: DashMap<SlotKey, Vec<u8>>,
    /// Number of successful writes
    write_count: AtomicUsize,
    /// Reject every write while set
    fail_writes: AtomicBool,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Number of populated slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a slot with raw bytes, bypassing failure injection
    pub fn put_raw(&self, key: SlotKey, value: impl Into<Vec<u8>>) {
        self.slots.insert(key, value.into());
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn read(&self, key: &SlotKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.slots.get(key).map(|v| v.value().clone()))
    }

    async fn write(&self, key: &SlotKey, value: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(key.to_string()));
        }
        trace!(key = %key, bytes = value.len(), "Writing slot");
        self.slots.insert(key.clone(), value.to_vec());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &SlotKey) -> Result<(), StorageError> {
        self.slots.remove(key);
        Ok(())
    }
}
