//! Task protocol driven by the engine.
//!
//! A task is a bottom-up computation over one object graph. The engine owns
//! traversal order and child enumeration; the task owns what a node
//! concludes to and how reference cycles are resolved.
//!
//! ## Finish algorithm
//!
//! For each node N, in post-order:
//!
//! 1. N already has a cached conclusion → `revisit_conclusion`, which
//!    reuses the cached value unless the task overrides it
//! 2. N is terminal → `terminal_conclusion`
//! 3. N is open on this task's path → `cycle_conclusion` (no further descent)
//! 4. Otherwise push N on the path, finish every interesting child,
//!    `combine`, pop N and cache the conclusion
//!
//! `combine` runs at most once per node while the node's conclusion stays
//! cached, however many parents reach the node. A task that clears its
//! cache in `between_roots` (as [`crate::SizeTask`] does) combines a node
//! again when a later root reaches it.

use std::collections::{HashMap, HashSet};

use crate::graph::ObjectGraph;
use crate::types::{EdgeKind, EdgeKindSet, ObjectId};

/// A node being entered during the pre-order walk.
#[derive(Debug)]
pub struct Visit<'a, N> {
    /// Identity of the node.
    pub id: ObjectId,
    /// Handle to the node.
    pub node: &'a N,
    /// Edge the node was reached through; `None` for roots.
    pub edge: Option<EdgeKind>,
    /// Parent identity; `None` for roots.
    pub parent: Option<ObjectId>,
    /// Pre-order depth below the root.
    pub depth: usize,
}

/// Per-session state of one task: conclusion cache and open path.
#[derive(Debug, Clone)]
pub struct TaskState<C> {
    conclusions: HashMap<ObjectId, C>,
    path: Vec<ObjectId>,
    on_path: HashSet<ObjectId>,
}

impl<C> TaskState<C> {
    /// Create empty state.
    pub fn new() -> Self {
        Self {
            conclusions: HashMap::new(),
            path: Vec::new(),
            on_path: HashSet::new(),
        }
    }

    /// Drop all conclusions and the open path.
    pub fn reset(&mut self) {
        self.conclusions.clear();
        self.path.clear();
        self.on_path.clear();
    }

    /// Cached conclusion for a node.
    pub fn conclusion(&self, id: &ObjectId) -> Option<&C> {
        self.conclusions.get(id)
    }

    /// Cache a finished conclusion.
    pub fn record(&mut self, id: ObjectId, conclusion: C) {
        self.conclusions.insert(id, conclusion);
    }

    /// Number of cached conclusions.
    pub fn len(&self) -> usize {
        self.conclusions.len()
    }

    /// Check whether nothing has been concluded.
    pub fn is_empty(&self) -> bool {
        self.conclusions.is_empty()
    }

    /// Open a node on the path.
    pub fn push_path(&mut self, id: ObjectId) {
        self.path.push(id);
        self.on_path.insert(id);
    }

    /// Close the innermost open node. Returns false if `id` is not innermost.
    pub fn pop_path(&mut self, id: ObjectId) -> bool {
        if self.path.last() != Some(&id) {
            return false;
        }
        self.path.pop();
        self.on_path.remove(&id);
        true
    }

    /// Check whether a node is open on the path.
    pub fn is_on_path(&self, id: &ObjectId) -> bool {
        self.on_path.contains(id)
    }

    /// Open nodes, outermost first.
    pub fn path(&self) -> &[ObjectId] {
        &self.path
    }
}

impl<C> Default for TaskState<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pluggable bottom-up computation.
///
/// Implementations are driven by [`crate::Engine`]. Hook errors are host
/// errors and are surfaced to the caller unchanged.
pub trait Task<G: ObjectGraph> {
    /// Per-node result.
    type Conclusion: Clone;

    /// Task name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Edge kinds this task descends along. Fixed for the task's lifetime.
    fn interests(&self) -> EdgeKindSet;

    /// Per-session state.
    fn state(&self) -> &TaskState<Self::Conclusion>;

    /// Mutable per-session state.
    fn state_mut(&mut self) -> &mut TaskState<Self::Conclusion>;

    /// Reset all per-session state. Called once before any root.
    fn initialize(&mut self) {
        self.state_mut().reset();
    }

    /// Called before every root after the first.
    fn between_roots(&mut self) {}

    /// Called with each root's conclusion once it is finished.
    fn root_finished(&mut self, _root: ObjectId, _conclusion: &Self::Conclusion) {}

    /// Pre-order hook, once per node per session.
    fn enter(&mut self, _visit: &Visit<'_, G::Node>) {}

    /// Whether the node is open on this task's path.
    fn is_cycle(&self, id: ObjectId) -> bool {
        self.state().is_on_path(&id)
    }

    /// Conclusion contributed by a node reached again after it was finished.
    fn revisit_conclusion(
        &mut self,
        _graph: &G,
        _node: &G::Node,
        cached: &Self::Conclusion,
    ) -> Self::Conclusion {
        cached.clone()
    }

    /// Conclusion for a terminal node.
    fn terminal_conclusion(&mut self, graph: &G, node: &G::Node) -> Result<Self::Conclusion, G::Error>;

    /// Conclusion for a back-edge to a node open on the path. Must not recurse.
    fn cycle_conclusion(&mut self, graph: &G, node: &G::Node) -> Result<Self::Conclusion, G::Error>;

    /// Aggregate a node from its children's conclusions, in child order.
    fn combine(
        &mut self,
        graph: &G,
        node: &G::Node,
        children: &[(EdgeKind, Self::Conclusion)],
    ) -> Result<Self::Conclusion, G::Error>;

    /// Finished conclusion for a root.
    fn result(&self, root: ObjectId) -> Option<&Self::Conclusion> {
        self.state().conclusion(&root)
    }
}
