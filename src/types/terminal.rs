//! Caller-supplied terminal kinds.

use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Extra host kinds the engine must treat as terminal.
///
/// These are merged with the host's built-in terminators (numeric, textual
/// and binary scalars, opaque blobs). A terminal node is sized by its
/// shallow size alone and never expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalKinds<K> {
    kinds: Vec<K>,
}

impl<K: Copy + Eq + Hash> TerminalKinds<K> {
    /// No extra terminal kinds.
    pub fn none() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Terminal kinds from a list; duplicates are dropped.
    pub fn new(kinds: impl IntoIterator<Item = K>) -> Self {
        let mut set = Self::none();
        for kind in kinds {
            set.insert(kind);
        }
        set
    }

    /// Add a kind.
    pub fn insert(&mut self, kind: K) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    /// Check whether a kind is terminal.
    pub fn contains(&self, kind: &K) -> bool {
        self.kinds.contains(kind)
    }

    /// Number of extra kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check whether no extra kinds are configured.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl<K> Default for TerminalKinds<K> {
    fn default() -> Self {
        Self { kinds: Vec::new() }
    }
}
