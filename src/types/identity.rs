//! Identity tokens for observed objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-session identity of one runtime object.
///
/// Two handles to the same object yield the same `ObjectId`; value equality
/// plays no part. A token is only meaningful inside the traversal session
/// that observed it.
///
/// Implements `Ord` so sets of identities iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Create an identity from a raw token.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw token.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
