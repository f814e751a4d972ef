//! Host object models.
//!
//! The engine never inspects objects directly. A host plugs its concrete
//! object model in through [`ObjectGraph`], mapping its reflection mechanism
//! onto the closed set of [`EdgeKind`]s.

pub mod heap;

use std::fmt::Debug;
use std::hash::Hash;

use crate::types::{EdgeKind, EdgeKindSet, ObjectId, TerminalKinds};

/// A child reached from a parent along one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Child<N> {
    /// How the child is reached.
    pub kind: EdgeKind,
    /// Handle to the child object.
    pub node: N,
}

impl<N> Child<N> {
    /// Create a child entry.
    pub fn new(kind: EdgeKind, node: N) -> Self {
        Self { kind, node }
    }
}

/// Trait for host object models.
///
/// Implementations must guarantee:
/// - `identity_of` is stable for the lifetime of a session and distinct
///   for distinct objects
/// - `children_of` yields children in a deterministic order and only along
///   the requested edge kinds
/// - `shallow_size_of` excludes everything reachable through children
pub trait ObjectGraph {
    /// Handle to one object.
    type Node: Clone;
    /// Host type tag, matched against caller-supplied terminal kinds.
    type Kind: Copy + Eq + Hash + Debug;
    /// Error type for host hooks.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Identity token of an object.
    fn identity_of(&self, node: &Self::Node) -> ObjectId;

    /// Whether two handles refer to the same object.
    ///
    /// Only used to detect identity collisions.
    fn same_object(&self, a: &Self::Node, b: &Self::Node) -> bool;

    /// Host type tag of an object.
    fn kind_of(&self, node: &Self::Node) -> Self::Kind;

    /// Bytes used by the object itself, excluding its children.
    fn shallow_size_of(&self, node: &Self::Node) -> Result<u64, Self::Error>;

    /// Children along the edge kinds in `interests`, in declared order.
    fn children_of(
        &self,
        node: &Self::Node,
        interests: EdgeKindSet,
    ) -> Result<Vec<Child<Self::Node>>, Self::Error>;

    /// Whether the object belongs to the host's built-in terminal set.
    fn is_builtin_terminal(&self, node: &Self::Node) -> bool;

    /// Whether the engine must not expand the object.
    fn is_terminal(&self, node: &Self::Node, extra: &TerminalKinds<Self::Kind>) -> bool {
        self.is_builtin_terminal(node) || extra.contains(&self.kind_of(node))
    }
}

pub use heap::{HeapError, HeapGraph, HeapKind, HeapRef, HeapValue};
