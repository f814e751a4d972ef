//! Footprint configuration.
//!
//! Configuration is passed explicitly to every run; there is no global
//! terminator list or mutable shared state between sessions.

use serde::{Deserialize, Serialize};
use std::hash::Hash;

use crate::error::TraversalError;
use crate::types::TerminalKinds;
use crate::DEFAULT_POINTER_WORD_SIZE;

/// Configuration for size and overlap analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintConfig<K> {
    /// Bytes charged for a back-reference that closes a cycle.
    pub pointer_word_size: u64,
    /// Host kinds treated as terminal in addition to the built-in set.
    pub terminal_kinds: TerminalKinds<K>,
}

impl<K: Copy + Eq + Hash> FootprintConfig<K> {
    /// Default configuration: 8-byte pointers, no extra terminal kinds.
    pub fn new() -> Self {
        Self {
            pointer_word_size: DEFAULT_POINTER_WORD_SIZE,
            terminal_kinds: TerminalKinds::none(),
        }
    }

    /// Configuration using the build target's pointer width.
    pub fn native() -> Self {
        Self::new().with_pointer_word_size(std::mem::size_of::<usize>() as u64)
    }

    /// Set the pointer word size.
    pub fn with_pointer_word_size(mut self, bytes: u64) -> Self {
        self.pointer_word_size = bytes;
        self
    }

    /// Set the extra terminal kinds.
    pub fn with_terminal_kinds(mut self, kinds: impl IntoIterator<Item = K>) -> Self {
        self.terminal_kinds = TerminalKinds::new(kinds);
        self
    }

    /// Reject configurations that cannot produce meaningful sizes.
    pub fn validate(&self) -> Result<(), TraversalError> {
        if self.pointer_word_size == 0 {
            return Err(TraversalError::Configuration(
                "pointer_word_size must be at least one byte".to_string(),
            ));
        }
        Ok(())
    }
}

impl<K: Copy + Eq + Hash> Default for FootprintConfig<K> {
    fn default() -> Self {
        Self::new()
    }
}
