//! User identity
//!
//! Every remote call and every local cache namespace is scoped to the
//! authenticated account, represented by [`UserId`].

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The authenticated account that owns a set of notes
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A filesystem- and key-safe form of the id
    ///
    /// Anything outside `[A-Za-z0-9_-]` is replaced with `_`.
    pub fn namespace_key(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
