//! # Jot Core
//!
//! Core traits, types, and errors for the Jot offline-first notes stack.
//!
//! This crate holds the vocabulary shared by the storage layer, the sync
//! engine, and the remote clients, so that the same sync logic can run
//! against a hosted backend in production and an in-memory fake in tests.
//!
//! ## Key Traits
//!
//! - [`RemoteStore`]: Authenticated CRUD against the authoritative note store
//! - [`ConnectivityMonitor`]: Network reachability with change notifications
//!
//! ## Key Types
//!
//! - [`Note`]: A user-owned title/description record
//! - [`QueueOp`]: A local mutation not yet confirmed by the remote store
//! - [`UserId`]: The authenticated account a note belongs to
//! - [`MockRemoteStore`]: Recording remote store with failure injection

pub mod connectivity;
pub mod error;
pub mod identity;
pub mod mock_remote;
pub mod note;
pub mod queue;
pub mod traits;

// Re-export main types
pub use connectivity::*;
pub use error::*;
pub use identity::*;
pub use mock_remote::*;
pub use note::*;
pub use queue::*;
pub use traits::*;
