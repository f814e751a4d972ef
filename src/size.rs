//! Deduplicated byte footprint.
//!
//! A root's size is the shallow size of every distinct node reachable from
//! it, plus one pointer word for every back-edge that closes a cycle.
//!
//! ## Charging
//!
//! While one root is finished, each node contributes:
//!
//! 1. First visit → its shallow size plus what its children contribute
//! 2. Back-edge to a node open on the path → `pointer_word_size`
//! 3. Any later visit → nothing, its bytes are already in the total
//!
//! A node's cached conclusion is therefore the bytes first charged beneath
//! it, which depends on the root. The cache is cleared between roots, so
//! every root is sized as if it were alone. Cross-root sharing is handled
//! by [`crate::overlap`].

use std::collections::HashMap;

use crate::engine::TraversalSession;
use crate::error::TraversalError;
use crate::graph::ObjectGraph;
use crate::task::{Task, TaskState};
use crate::types::{EdgeKind, EdgeKindSet, ObjectId};

/// Task computing the deduplicated size of every root.
#[derive(Debug, Clone)]
pub struct SizeTask {
    pointer_word_size: u64,
    state: TaskState<u64>,
    roots: HashMap<ObjectId, u64>,
}

impl SizeTask {
    /// Create a size task charging `pointer_word_size` bytes per cyclic back-edge.
    pub fn new(pointer_word_size: u64) -> Self {
        Self {
            pointer_word_size,
            state: TaskState::new(),
            roots: HashMap::new(),
        }
    }

    /// Bytes charged for a cyclic back-edge.
    pub fn pointer_word_size(&self) -> u64 {
        self.pointer_word_size
    }

    /// Bytes first charged beneath a node while finishing the last root.
    ///
    /// Equals the node's own size only when the node was that root or was
    /// first reached through an edge nothing else had charged yet. Use
    /// [`SizeTask::root_size`] for roots.
    pub fn get(&self, id: ObjectId) -> Option<u64> {
        self.state.conclusion(&id).copied()
    }

    /// Size of a root of the last session.
    pub fn root_size(&self, root: ObjectId) -> Option<u64> {
        self.roots.get(&root).copied()
    }

    /// Size of any observed node as if it were the only root.
    ///
    /// Reuses the session's cached children; nothing is enumerated again.
    /// Clears whatever this task had cached.
    pub fn standalone<G: ObjectGraph>(
        &mut self,
        session: &TraversalSession<'_, G>,
        id: ObjectId,
    ) -> Result<u64, TraversalError> {
        self.state.reset();
        session.finish(self as &mut dyn Task<G, Conclusion = u64>, id)
    }
}

impl<G: ObjectGraph> Task<G> for SizeTask {
    type Conclusion = u64;

    fn name(&self) -> &'static str {
        "size"
    }

    fn interests(&self) -> EdgeKindSet {
        EdgeKindSet::all()
    }

    fn state(&self) -> &TaskState<u64> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TaskState<u64> {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.state.reset();
        self.roots.clear();
    }

    fn between_roots(&mut self) {
        self.state.reset();
    }

    fn root_finished(&mut self, root: ObjectId, size: &u64) {
        self.roots.insert(root, *size);
    }

    fn result(&self, root: ObjectId) -> Option<&u64> {
        self.roots.get(&root).or_else(|| self.state.conclusion(&root))
    }

    fn revisit_conclusion(&mut self, _graph: &G, _node: &G::Node, _cached: &u64) -> u64 {
        0
    }

    fn terminal_conclusion(&mut self, graph: &G, node: &G::Node) -> Result<u64, G::Error> {
        graph.shallow_size_of(node)
    }

    fn cycle_conclusion(&mut self, _graph: &G, _node: &G::Node) -> Result<u64, G::Error> {
        Ok(self.pointer_word_size)
    }

    fn combine(
        &mut self,
        graph: &G,
        node: &G::Node,
        children: &[(EdgeKind, u64)],
    ) -> Result<u64, G::Error> {
        let own = graph.shallow_size_of(node)?;
        Ok(own + children.iter().map(|(_, size)| size).sum::<u64>())
    }
}
