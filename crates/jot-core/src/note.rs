//! Note data model
//!
//! A note is identified solely by its [`NoteId`]; two notes are the same
//! entity iff their ids match, regardless of title or description.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A unique identifier for a note
///
/// Generated from random bits rather than the clock so that notes created in
/// rapid succession, or on several offline devices, never collide.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing id (e.g. one read back from the remote store)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get a short display form (for logging and CLI listings)
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A note in the user's collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier, immutable after creation
    pub id: NoteId,
    /// Note title
    pub title: String,
    /// Note body
    pub desc: String,
}

impl Note {
    /// Create a new note with a freshly generated id
    pub fn new(title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id: NoteId::generate(),
            title: title.into(),
            desc: desc.into(),
        }
    }

    /// Create a note with a known id
    pub fn with_id(id: impl Into<NoteId>, title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            desc: desc.into(),
        }
    }

    /// The mutable fields of this note, as sent in a remote update
    pub fn fields(&self) -> NoteFields {
        NoteFields {
            title: self.title.clone(),
            desc: self.desc.clone(),
        }
    }

    /// Get a short preview of the description
    pub fn preview(&self, max_chars: usize) -> String {
        if self.desc.chars().count() <= max_chars {
            self.desc.clone()
        } else {
            let cut: String = self.desc.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut)
        }
    }
}

/// Field set carried by a remote update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    pub title: String,
    pub desc: String,
}
