//! Shared-footprint overlap between roots.
//!
//! For N roots, produces an N×N matrix where the diagonal holds each root's
//! own deduplicated size and cell (i, j) holds the bytes reachable from both
//! root i and root j.
//!
//! ## Algorithm (i ≠ j)
//!
//! 1. `descendants(root)`: plain reachability over the session's cached
//!    child lists, root included
//! 2. `shared = descendants(i) ∩ descendants(j)`
//! 3. Prune `shared` to its top-most members in one pass: split the edges
//!    among shared members into strongly connected components and keep the
//!    smallest identity of each component nothing else in `shared` reaches
//! 4. Sum the standalone sizes of what remains
//!
//! Step 3 is what prevents double counting: a shared node's size already
//! includes everything below it. Every path leaving a shared node stays
//! inside `shared`, so edges among members decide reachability exactly.
//! A shared node's size is the size it has as a root of its own.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::engine::TraversalSession;
use crate::error::{InvariantViolation, TraversalError};
use crate::graph::ObjectGraph;
use crate::size::SizeTask;
use crate::task::{Task, TaskState, Visit};
use crate::types::{EdgeKind, EdgeKindSet, ObjectId};

/// A pair of roots that share memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedPair {
    /// Index of the first root (always the smaller index).
    pub root_a: usize,
    /// Index of the second root.
    pub root_b: usize,
    /// Bytes reachable from both roots.
    pub shared_bytes: u64,
}

/// N×N shared-footprint matrix, rows and columns in root order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlapMatrix {
    /// Root identities, in argument order. Only meaningful within the session.
    pub roots: Vec<ObjectId>,
    /// Matrix cells.
    pub sizes: Vec<Vec<u64>>,
    /// Content hash of the cells, for reproducibility checks.
    pub matrix_hash: String,
}

impl OverlapMatrix {
    /// Create a matrix from its cells.
    pub fn new(roots: Vec<ObjectId>, sizes: Vec<Vec<u64>>) -> Self {
        let matrix_hash = Self::compute_hash(&sizes);
        Self {
            roots,
            sizes,
            matrix_hash,
        }
    }

    fn compute_hash(sizes: &[Vec<u64>]) -> String {
        use std::hash::Hasher;
        use xxhash_rust::xxh64::Xxh64;

        let mut hasher = Xxh64::new(0);
        hasher.write(&(sizes.len() as u64).to_le_bytes());
        for cell in sizes.iter().flatten() {
            hasher.write(&cell.to_le_bytes());
        }

        format!("{:016x}", hasher.finish())
    }

    /// Number of roots.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Check whether the matrix has no roots.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Cell (i, j).
    pub fn get(&self, i: usize, j: usize) -> Option<u64> {
        self.sizes.get(i)?.get(j).copied()
    }

    /// Each root's own size.
    pub fn diagonal(&self) -> Vec<u64> {
        self.sizes
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i).copied())
            .collect()
    }

    /// Matrix rows.
    pub fn rows(&self) -> &[Vec<u64>] {
        &self.sizes
    }

    /// Root pairs with non-zero overlap, ordered by (root_a, root_b).
    pub fn shared_pairs(&self) -> Vec<SharedPair> {
        let mut pairs = Vec::new();
        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                let shared_bytes = self.get(i, j).unwrap_or(0);
                if shared_bytes > 0 {
                    pairs.push(SharedPair { root_a: i, root_b: j, shared_bytes });
                }
            }
        }
        pairs
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Task computing pairwise shared footprint.
///
/// Drives an inner [`SizeTask`] through the engine, then builds the matrix
/// from the finished session in [`OverlapTask::wrap_up`].
#[derive(Debug, Clone)]
pub struct OverlapTask {
    size: SizeTask,
}

impl OverlapTask {
    /// Create an overlap task charging `pointer_word_size` bytes per cyclic back-edge.
    pub fn new(pointer_word_size: u64) -> Self {
        Self {
            size: SizeTask::new(pointer_word_size),
        }
    }

    /// The inner size task.
    pub fn size_task(&self) -> &SizeTask {
        &self.size
    }

    /// Build the overlap matrix from a finished session.
    ///
    /// `roots` must be the root identities of the run that drove this task.
    pub fn wrap_up<G: ObjectGraph>(
        &self,
        session: &TraversalSession<'_, G>,
        roots: &[ObjectId],
    ) -> Result<OverlapMatrix, TraversalError> {
        let interests = Task::<G>::interests(&self.size);
        let n = roots.len();

        let reach: Vec<BTreeSet<ObjectId>> = roots
            .iter()
            .map(|root| session.descendants(*root, interests))
            .collect();
        let mut scratch = SizeTask::new(self.size.pointer_word_size());
        let mut top_sizes: HashMap<ObjectId, u64> = HashMap::new();

        let mut sizes = vec![vec![0u64; n]; n];
        for i in 0..n {
            sizes[i][i] = self.root_size(roots[i])?;

            for j in (i + 1)..n {
                let shared: BTreeSet<ObjectId> = reach[i].intersection(&reach[j]).copied().collect();
                let tops = prune(session, &shared, interests);

                let mut bytes = 0;
                for id in &tops {
                    bytes += match top_sizes.get(id) {
                        Some(size) => *size,
                        None => {
                            let size = scratch.standalone(session, *id)?;
                            top_sizes.insert(*id, size);
                            size
                        }
                    };
                }

                debug!(i, j, shared_tops = tops.len(), bytes, "overlap cell");
                sizes[i][j] = bytes;
                sizes[j][i] = bytes;
            }
        }

        Ok(OverlapMatrix::new(roots.to_vec(), sizes))
    }

    fn root_size(&self, id: ObjectId) -> Result<u64, TraversalError> {
        self.size.root_size(id).ok_or_else(|| {
            TraversalError::violation(InvariantViolation::MissingConclusion {
                task: "size",
                id,
            })
        })
    }
}

/// Reduce `shared` to the members no other member reaches.
///
/// Mutually reachable members (a cycle) keep the smallest identity.
/// Iterative Tarjan over the edges among members; each member and edge is
/// visited once.
fn prune<G: ObjectGraph>(
    session: &TraversalSession<'_, G>,
    shared: &BTreeSet<ObjectId>,
    interests: EdgeKindSet,
) -> BTreeSet<ObjectId> {
    const UNSEEN: usize = usize::MAX;

    let members: Vec<ObjectId> = shared.iter().copied().collect();
    let slot: HashMap<ObjectId, usize> = members.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let edges: Vec<Vec<usize>> = members
        .iter()
        .map(|id| {
            session
                .children(*id)
                .unwrap_or(&[])
                .iter()
                .filter(|child| interests.contains(child.kind))
                .filter_map(|child| slot.get(&child.id).copied())
                .collect()
        })
        .collect();

    let n = members.len();
    let mut index = vec![UNSEEN; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut component = vec![UNSEEN; n];
    let mut components = 0;
    let mut next = 0;
    let mut stack = Vec::new();

    for start in 0..n {
        if index[start] != UNSEEN {
            continue;
        }
        index[start] = next;
        low[start] = next;
        next += 1;
        stack.push(start);
        on_stack[start] = true;
        let mut work = vec![(start, 0usize)];

        while let Some((v, edge)) = work.last_mut() {
            let v = *v;
            if let Some(&w) = edges[v].get(*edge) {
                *edge += 1;
                if index[w] == UNSEEN {
                    index[w] = next;
                    low[w] = next;
                    next += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    work.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if low[v] == index[v] {
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component[w] = components;
                    if w == v {
                        break;
                    }
                }
                components += 1;
            }
        }
    }

    let mut reached = vec![false; components];
    for (v, targets) in edges.iter().enumerate() {
        for w in targets {
            if component[*w] != component[v] {
                reached[component[*w]] = true;
            }
        }
    }

    // Members are in ascending order, so the first seen per component is its smallest
    let mut tops = BTreeSet::new();
    let mut kept = vec![false; components];
    for (v, id) in members.iter().enumerate() {
        let c = component[v];
        if !reached[c] && !kept[c] {
            kept[c] = true;
            tops.insert(*id);
        }
    }
    tops
}

impl<G: ObjectGraph> Task<G> for OverlapTask {
    type Conclusion = u64;

    fn name(&self) -> &'static str {
        "overlap"
    }

    fn interests(&self) -> EdgeKindSet {
        Task::<G>::interests(&self.size)
    }

    fn state(&self) -> &TaskState<u64> {
        Task::<G>::state(&self.size)
    }

    fn state_mut(&mut self) -> &mut TaskState<u64> {
        Task::<G>::state_mut(&mut self.size)
    }

    fn initialize(&mut self) {
        Task::<G>::initialize(&mut self.size)
    }

    fn between_roots(&mut self) {
        Task::<G>::between_roots(&mut self.size)
    }

    fn root_finished(&mut self, root: ObjectId, size: &u64) {
        Task::<G>::root_finished(&mut self.size, root, size)
    }

    fn result(&self, root: ObjectId) -> Option<&u64> {
        Task::<G>::result(&self.size, root)
    }

    fn revisit_conclusion(&mut self, graph: &G, node: &G::Node, cached: &u64) -> u64 {
        self.size.revisit_conclusion(graph, node, cached)
    }

    fn enter(&mut self, visit: &Visit<'_, G::Node>) {
        Task::<G>::enter(&mut self.size, visit)
    }

    fn terminal_conclusion(&mut self, graph: &G, node: &G::Node) -> Result<u64, G::Error> {
        self.size.terminal_conclusion(graph, node)
    }

    fn cycle_conclusion(&mut self, graph: &G, node: &G::Node) -> Result<u64, G::Error> {
        self.size.cycle_conclusion(graph, node)
    }

    fn combine(
        &mut self,
        graph: &G,
        node: &G::Node,
        children: &[(EdgeKind, u64)],
    ) -> Result<u64, G::Error> {
        self.size.combine(graph, node, children)
    }
}
