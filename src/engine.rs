//! Traversal engine.
//!
//! The engine walks one or more roots depth-first, registering every
//! observed object and caching each node's children exactly once, then
//! drives every task's finish algorithm over the shared session.
//!
//! ## Algorithm
//!
//! For each root, left to right:
//!
//! 1. Pre-order walk: observe the node, call every task's `enter`, expand
//!    non-terminal nodes along the union of all task interests
//! 2. Post-order finish: run each task's finish algorithm on the root
//!
//! Both phases use explicit work stacks, so arbitrarily deep acyclic chains
//! do not grow the native call stack.
//!
//! ## Session lifetime
//!
//! A [`TraversalSession`] is created fresh by every [`Engine::run`] and holds
//! clones of every observed node handle until it is dropped. Sessions are
//! never shared between runs.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::FootprintConfig;
use crate::error::{InvariantViolation, TraversalError};
use crate::graph::ObjectGraph;
use crate::task::{Task, Visit};
use crate::types::{EdgeKind, EdgeKindSet, ObjectId, TerminalKinds};

/// A cached child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildRef {
    /// How the child is reached.
    pub kind: EdgeKind,
    /// Child identity.
    pub id: ObjectId,
}

/// State of one `run`: observed objects, cached children, expanded nodes.
pub struct TraversalSession<'g, G: ObjectGraph> {
    id: Uuid,
    graph: &'g G,
    interests: EdgeKindSet,
    terminal_kinds: TerminalKinds<G::Kind>,
    objects: HashMap<ObjectId, G::Node>,
    children: HashMap<ObjectId, Vec<ChildRef>>,
    handled: HashSet<ObjectId>,
}

struct WalkEntry {
    id: ObjectId,
    edge: Option<EdgeKind>,
    parent: Option<ObjectId>,
    depth: usize,
}

struct Frame<C> {
    id: ObjectId,
    edge: Option<EdgeKind>,
    children: Vec<ChildRef>,
    next: usize,
    collected: Vec<(EdgeKind, C)>,
}

enum Opened<C> {
    Concluded(C),
    Open(Frame<C>),
}

impl<'g, G: ObjectGraph> TraversalSession<'g, G> {
    fn new(graph: &'g G, interests: EdgeKindSet, terminal_kinds: TerminalKinds<G::Kind>) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph,
            interests,
            terminal_kinds,
            objects: HashMap::new(),
            children: HashMap::new(),
            handled: HashSet::new(),
        }
    }

    /// Session identifier, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Host graph.
    pub fn graph(&self) -> &'g G {
        self.graph
    }

    /// Union of all task interests; the edges children were expanded along.
    pub fn interests(&self) -> EdgeKindSet {
        self.interests
    }

    /// Observed node by identity.
    pub fn node(&self, id: ObjectId) -> Option<&G::Node> {
        self.objects.get(&id)
    }

    /// Cached children of an expanded node.
    pub fn children(&self, id: ObjectId) -> Option<&[ChildRef]> {
        self.children.get(&id).map(Vec::as_slice)
    }

    /// Number of observed objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Check whether a node has been entered by the walk.
    pub fn is_handled(&self, id: ObjectId) -> bool {
        self.handled.contains(&id)
    }

    /// Whether the engine treats a node as terminal in this session.
    pub fn is_terminal(&self, node: &G::Node) -> bool {
        self.graph.is_terminal(node, &self.terminal_kinds)
    }

    /// Every identity reachable from `root` along `interests`, including
    /// `root` itself.
    ///
    /// Plain set reachability over the cached child lists; cycles only stop
    /// the search, they are not charged.
    pub fn descendants(&self, root: ObjectId, interests: EdgeKindSet) -> BTreeSet<ObjectId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        seen.insert(root);

        while let Some(id) = stack.pop() {
            for child in self.children(id).unwrap_or(&[]) {
                if interests.contains(child.kind) && seen.insert(child.id) {
                    stack.push(child.id);
                }
            }
        }

        seen
    }

    /// Register a node, rejecting identity collisions.
    fn observe(&mut self, node: &G::Node) -> Result<ObjectId, TraversalError> {
        let id = self.graph.identity_of(node);
        match self.objects.get(&id) {
            Some(existing) if !self.graph.same_object(existing, node) => {
                Err(TraversalError::violation(InvariantViolation::IdentityCollision(id)))
            }
            Some(_) => Ok(id),
            None => {
                self.objects.insert(id, node.clone());
                Ok(id)
            }
        }
    }

    /// Enumerate a node's children once and cache them.
    fn expand(&mut self, id: ObjectId, node: &G::Node) -> Result<Vec<ChildRef>, TraversalError> {
        if let Some(cached) = self.children.get(&id) {
            return Ok(cached.clone());
        }

        let children = self
            .graph
            .children_of(node, self.interests)
            .map_err(TraversalError::from_host)?;

        let mut refs = Vec::with_capacity(children.len());
        for child in &children {
            let child_id = self.observe(&child.node)?;
            refs.push(ChildRef { kind: child.kind, id: child_id });
        }

        trace!(node = %id, children = refs.len(), "expanded");
        self.children.insert(id, refs.clone());
        Ok(refs)
    }

    /// Pre-order walk from one root.
    fn walk<C: Clone>(
        &mut self,
        root: &G::Node,
        tasks: &mut [&mut dyn Task<G, Conclusion = C>],
    ) -> Result<ObjectId, TraversalError> {
        let root_id = self.observe(root)?;
        let mut stack = vec![WalkEntry { id: root_id, edge: None, parent: None, depth: 0 }];

        while let Some(entry) = stack.pop() {
            if !self.handled.insert(entry.id) {
                continue;
            }

            let node = self
                .objects
                .get(&entry.id)
                .cloned()
                .ok_or_else(|| TraversalError::violation(InvariantViolation::UnknownNode(entry.id)))?;

            let visit = Visit {
                id: entry.id,
                node: &node,
                edge: entry.edge,
                parent: entry.parent,
                depth: entry.depth,
            };
            for task in tasks.iter_mut() {
                task.enter(&visit);
            }

            if self.is_terminal(&node) {
                continue;
            }

            let children = self.expand(entry.id, &node)?;
            // Reversed so the first child is walked first
            for child in children.iter().rev() {
                if !self.handled.contains(&child.id) {
                    stack.push(WalkEntry {
                        id: child.id,
                        edge: Some(child.kind),
                        parent: Some(entry.id),
                        depth: entry.depth + 1,
                    });
                }
            }
        }

        Ok(root_id)
    }

    /// Run a task's finish algorithm on an already walked node.
    ///
    /// Any node observed by the session can be finished, not only roots.
    /// A node that already has a conclusion returns it unchanged.
    pub fn finish<C: Clone>(
        &self,
        task: &mut dyn Task<G, Conclusion = C>,
        root: ObjectId,
    ) -> Result<C, TraversalError> {
        if let Some(conclusion) = task.state().conclusion(&root) {
            return Ok(conclusion.clone());
        }

        let mut stack = match self.open(task, root, None)? {
            Opened::Concluded(conclusion) => return Ok(conclusion),
            Opened::Open(frame) => vec![frame],
        };

        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.children.get(frame.next).copied() {
                frame.next += 1;
                match self.open(task, child.id, Some(child.kind))? {
                    Opened::Concluded(conclusion) => frame.collected.push((child.kind, conclusion)),
                    Opened::Open(child_frame) => stack.push(child_frame),
                }
                continue;
            }

            let Some(frame) = stack.pop() else { break };
            let edge = frame.edge;
            let conclusion = self.close(task, frame)?;

            match (stack.last_mut(), edge) {
                (Some(parent), Some(kind)) => parent.collected.push((kind, conclusion)),
                _ => return Ok(conclusion),
            }
        }

        Err(TraversalError::violation(InvariantViolation::MissingConclusion {
            task: task.name(),
            id: root,
        }))
    }

    fn open<C: Clone>(
        &self,
        task: &mut dyn Task<G, Conclusion = C>,
        id: ObjectId,
        edge: Option<EdgeKind>,
    ) -> Result<Opened<C>, TraversalError> {
        let node = self
            .node(id)
            .ok_or_else(|| TraversalError::violation(InvariantViolation::UnknownNode(id)))?;

        if let Some(cached) = task.state().conclusion(&id).cloned() {
            return Ok(Opened::Concluded(task.revisit_conclusion(self.graph, node, &cached)));
        }

        if self.is_terminal(node) {
            let conclusion = task
                .terminal_conclusion(self.graph, node)
                .map_err(TraversalError::from_host)?;
            task.state_mut().record(id, conclusion.clone());
            return Ok(Opened::Concluded(conclusion));
        }

        if task.is_cycle(id) {
            trace!(task = task.name(), node = %id, "cycle stub");
            let conclusion = task
                .cycle_conclusion(self.graph, node)
                .map_err(TraversalError::from_host)?;
            return Ok(Opened::Concluded(conclusion));
        }

        let interests = task.interests();
        let children: Vec<ChildRef> = self
            .children(id)
            .ok_or_else(|| TraversalError::violation(InvariantViolation::Unexpanded(id)))?
            .iter()
            .filter(|child| interests.contains(child.kind))
            .copied()
            .collect();

        task.state_mut().push_path(id);
        Ok(Opened::Open(Frame {
            id,
            edge,
            collected: Vec::with_capacity(children.len()),
            children,
            next: 0,
        }))
    }

    fn close<C: Clone>(
        &self,
        task: &mut dyn Task<G, Conclusion = C>,
        frame: Frame<C>,
    ) -> Result<C, TraversalError> {
        if frame.collected.len() != frame.children.len() {
            return Err(TraversalError::violation(InvariantViolation::UnfinishedChildren {
                task: task.name(),
                id: frame.id,
                finished: frame.collected.len(),
                expected: frame.children.len(),
            }));
        }

        let node = self
            .node(frame.id)
            .ok_or_else(|| TraversalError::violation(InvariantViolation::UnknownNode(frame.id)))?;

        let conclusion = task
            .combine(self.graph, node, &frame.collected)
            .map_err(TraversalError::from_host)?;

        if !task.state_mut().pop_path(frame.id) {
            return Err(TraversalError::violation(InvariantViolation::PathCorrupted {
                task: task.name(),
                id: frame.id,
            }));
        }
        task.state_mut().record(frame.id, conclusion.clone());
        Ok(conclusion)
    }
}

/// A finished run: the session, root identities and per-task conclusions.
pub struct Traversal<'g, G: ObjectGraph, C> {
    /// The session the run used.
    pub session: TraversalSession<'g, G>,
    /// Root identities, in argument order.
    pub roots: Vec<ObjectId>,
    /// One entry per task, each with one conclusion per root.
    pub conclusions: Vec<Vec<C>>,
}

/// Identity-memoized, cycle-safe traversal engine.
///
/// ## Example
///
/// ```rust
/// use object_footprint::{Engine, FootprintConfig, HeapGraph, SizeTask, Task};
///
/// let mut heap = HeapGraph::new();
/// let one = heap.int(1);
/// let list = heap.list(vec![one, one]);
///
/// let engine = Engine::new(&heap, FootprintConfig::default());
/// let mut size = SizeTask::new(8);
/// let conclusions = engine.recurse(&[list], &mut [&mut size as &mut dyn Task<HeapGraph, Conclusion = u64>]).unwrap();
///
/// // The shared `1` is counted once
/// assert_eq!(conclusions[0][0], 72 + 28);
/// ```
pub struct Engine<'g, G: ObjectGraph> {
    graph: &'g G,
    config: FootprintConfig<G::Kind>,
}

impl<'g, G: ObjectGraph> Engine<'g, G> {
    /// Create an engine over a host graph.
    pub fn new(graph: &'g G, config: FootprintConfig<G::Kind>) -> Self {
        Self { graph, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FootprintConfig<G::Kind> {
        &self.config
    }

    /// Get the host graph.
    pub fn graph(&self) -> &'g G {
        self.graph
    }

    /// Run every task over every root and keep the session.
    ///
    /// Roots are processed left to right. Each task is initialized once,
    /// before the first root, and told about every root's conclusion as
    /// soon as that root is finished.
    pub fn run<C: Clone>(
        &self,
        roots: &[G::Node],
        tasks: &mut [&mut dyn Task<G, Conclusion = C>],
    ) -> Result<Traversal<'g, G, C>, TraversalError> {
        if tasks.is_empty() {
            return Err(TraversalError::Configuration(
                "at least one task is required".to_string(),
            ));
        }
        self.config.validate()?;

        let interests = tasks
            .iter()
            .fold(EdgeKindSet::empty(), |acc, task| acc.union(task.interests()));

        let mut session =
            TraversalSession::new(self.graph, interests, self.config.terminal_kinds.clone());

        let span = tracing::debug_span!(
            "traversal_session",
            session_id = %session.id(),
            roots = roots.len(),
            tasks = tasks.len(),
        );
        let _guard = span.enter();

        for task in tasks.iter_mut() {
            task.initialize();
        }

        let mut root_ids = Vec::with_capacity(roots.len());
        let mut conclusions: Vec<Vec<C>> = (0..tasks.len())
            .map(|_| Vec::with_capacity(roots.len()))
            .collect();

        for (index, root) in roots.iter().enumerate() {
            if index > 0 {
                for task in tasks.iter_mut() {
                    task.between_roots();
                }
            }

            debug!(root = index + 1, of = roots.len(), "walking root");
            let root_id = session.walk(root, tasks)?;

            for (task, out) in tasks.iter_mut().zip(conclusions.iter_mut()) {
                let conclusion = session.finish(&mut **task, root_id)?;
                task.root_finished(root_id, &conclusion);
                out.push(conclusion);
            }
            root_ids.push(root_id);
        }

        debug!(objects = session.len(), expanded = session.children.len(), "session finished");

        Ok(Traversal {
            session,
            roots: root_ids,
            conclusions,
        })
    }

    /// Run every task over every root; one conclusion list per task.
    pub fn recurse<C: Clone>(
        &self,
        roots: &[G::Node],
        tasks: &mut [&mut dyn Task<G, Conclusion = C>],
    ) -> Result<Vec<Vec<C>>, TraversalError> {
        Ok(self.run(roots, tasks)?.conclusions)
    }
}
