//! Slot naming
//!
//! The cache lives in two slots, one for the note collection and one for
//! the pending queue. Slots are grouped by namespace: one per signed-in
//! user, plus a device namespace used when nobody is signed in, so that a
//! second account on the same device never sees the first one's cache.

use std::fmt;

use jot_core::UserId;

/// Owner of a group of slots
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Shared device-level namespace, used without a signed-in user
    Device,
    /// Per-user namespace
    User(UserId),
}

impl Namespace {
    pub fn for_user(user: Option<&UserId>) -> Self {
        match user {
            Some(user) => Self::User(user.clone()),
            None => Self::Device,
        }
    }

    /// Key- and path-safe name of the namespace
    pub fn as_key(&self) -> String {
        match self {
            Self::Device => "device".to_string(),
            Self::User(user) => format!("user-{}", user.namespace_key()),
        }
    }
}

/// One of the two persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Notes,
    Queue,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Queue => "queue",
        }
    }
}

/// Fully qualified slot address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub namespace: Namespace,
    pub slot: Slot,
}

impl SlotKey {
    pub fn new(namespace: Namespace, slot: Slot) -> Self {
        Self { namespace, slot }
    }

    /// Flat string form, e.g. `jot:user-alice:notes`
    pub fn as_key(&self) -> String {
        format!("jot:{}:{}", self.namespace.as_key(), self.slot.name())
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}
