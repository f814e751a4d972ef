//! # object-footprint
//!
//! Deduplicated memory footprint and pairwise overlap for arbitrary,
//! possibly cyclic, object graphs.
//!
//! The crate answers two questions:
//!
//! > How many bytes does this object keep alive, counting shared parts once?
//!
//! > How many of those bytes does it share with each of these other objects?
//!
//! ## Architecture
//!
//! ```text
//! ObjectGraph (host) → Engine → TraversalSession → Task::finish → SizeTask
//!                                     ↓                               ↓
//!                          objects + child cache  →  OverlapTask::wrap_up → OverlapMatrix
//! ```
//!
//! A host plugs its object model in through [`ObjectGraph`]. The [`Engine`]
//! walks roots depth-first with identity memoization, caches every node's
//! children once per session and drives any number of [`Task`]s over the
//! shared session.
//!
//! ## Guarantees
//!
//! - Same graph + same tasks → identical conclusions
//! - `combine` runs at most once per node while its conclusion stays cached;
//!   [`SizeTask`] clears its cache between roots, so it combines a node once
//!   per root that reaches it
//! - Within one root, every distinct node is charged once
//! - A root's size never depends on the roots processed before it
//! - Every finite graph terminates; a back-edge to a node open on the path
//!   resolves to the task's cycle stub
//! - Traversal uses explicit work stacks, never native recursion

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod task;
pub mod engine;
pub mod size;
pub mod overlap;
pub mod config;
pub mod error;
pub mod footprint;

// Re-exports
pub use types::{ObjectId, EdgeKind, EdgeKindSet, TerminalKinds};
pub use graph::{Child, ObjectGraph, HeapGraph, HeapRef, HeapValue, HeapKind, HeapError};
pub use task::{Task, TaskState, Visit};
pub use engine::{Engine, TraversalSession, Traversal, ChildRef};
pub use size::SizeTask;
pub use overlap::{OverlapTask, OverlapMatrix, SharedPair};
pub use config::FootprintConfig;
pub use error::{TraversalError, InvariantViolation, HostError};
pub use footprint::{compute_size, compute_overlap};

/// Default bytes charged for a cyclic back-reference.
pub const DEFAULT_POINTER_WORD_SIZE: u64 = 8;
