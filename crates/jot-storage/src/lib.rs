//! # Jot Storage
//!
//! Local persistent storage for the offline note cache.
//!
//! The store is a durable key-value map of whole-collection slots. It knows
//! nothing about the network or the remote store; the sync engine is its
//! only writer and always replaces a slot wholesale.
//!
//! ## Features
//!
//! - **LocalStore trait**: Byte-level slot storage
//! - **InMemoryLocalStore**: In-memory implementation for testing, with
//!   write-failure injection
//! - **FileLocalStore**: One JSON file per slot, replaced atomically
//! - **NoteCache**: Typed access to the `notes` and `queue` slots of a
//!   namespace
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jot_core::{Note, UserId};
//! use jot_storage::{InMemoryLocalStore, Namespace, NoteCache};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(InMemoryLocalStore::new());
//!     let cache = NoteCache::new(store, Namespace::User(UserId::new("alice")));
//!
//!     cache.save_notes(&[Note::new("Groceries", "Milk, eggs")]).await.unwrap();
//!     assert_eq!(cache.load_notes().await.unwrap().len(), 1);
//! }
//! ```

pub mod cache;
pub mod error;
pub mod keys;
pub mod memory;
pub mod persistent;

// Re-exports
pub use cache::NoteCache;
pub use error::StorageError;
pub use keys::{Namespace, Slot, SlotKey};
pub use memory::InMemoryLocalStore;
pub use persistent::FileLocalStore;

use async_trait::async_trait;

/// Durable slot storage
///
/// Implementations must make a completed [`write`](Self::write) visible to
/// every later [`read`](Self::read), including across process restarts for
/// durable backends. Writes replace the whole slot.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read a slot, or `None` if it was never written
    async fn read(&self, key: &SlotKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the contents of a slot
    async fn write(&self, key: &SlotKey, value: &[u8]) -> Result<(), StorageError>;

    /// Remove a slot; removing a missing slot is not an error
    async fn remove(&self, key: &SlotKey) -> Result<(), StorageError>;
}
