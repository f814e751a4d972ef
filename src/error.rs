//! Error taxonomy for traversal sessions.
//!
//! | Error | When | Retried |
//! |-------|------|---------|
//! | `InvariantViolation` | Host identity contract broken, or engine construction bug | Never |
//! | `Configuration` | Rejected before any traversal starts | Never |
//! | `Host` | A host hook failed; the host's error is carried unchanged | Never |
//!
//! Every failure aborts the in-progress run. No partial results are returned.

use crate::types::ObjectId;

/// Boxed host error, carried through the engine without modification.
pub type HostError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal contract violations detected mid-session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Two distinct live objects reported the same identity token.
    #[error("Identity collision: two distinct objects reported identity {0}")]
    IdentityCollision(ObjectId),
    /// `combine` was about to run before all children had conclusions.
    #[error("Task {task} combined {id} with {finished} of {expected} children finished")]
    UnfinishedChildren {
        /// Task name.
        task: &'static str,
        /// Node being combined.
        id: ObjectId,
        /// Children with conclusions.
        finished: usize,
        /// Children the task is interested in.
        expected: usize,
    },
    /// A task asked for a node the session never observed.
    #[error("Node {0} was never observed in this session")]
    UnknownNode(ObjectId),
    /// A non-terminal node was finished before the walk expanded it.
    #[error("Node {0} was never expanded in this session")]
    Unexpanded(ObjectId),
    /// A task's open path no longer ends at the node being closed.
    #[error("Task {task} closed {id} but it was not innermost on its path")]
    PathCorrupted {
        /// Task name.
        task: &'static str,
        /// Node being closed.
        id: ObjectId,
    },
    /// A finished session has no conclusion for a reachable node.
    #[error("Task {task} has no conclusion for reachable node {id}")]
    MissingConclusion {
        /// Task name.
        task: &'static str,
        /// Node without a conclusion.
        id: ObjectId,
    },
}

impl InvariantViolation {
    /// Log this violation.
    pub fn log(&self) {
        tracing::error!(violation = %self, "TRAVERSAL_INVARIANT_VIOLATION");
    }
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// Fatal contract violation.
    #[error("Invariant violation: {0}")]
    InvariantViolation(#[from] InvariantViolation),
    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Error raised by a host hook.
    #[error("Host error: {0}")]
    Host(#[source] HostError),
}

impl TraversalError {
    /// Wrap any host error.
    pub fn from_host<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Host(Box::new(e))
    }

    /// Log and wrap an invariant violation.
    pub(crate) fn violation(violation: InvariantViolation) -> Self {
        violation.log();
        Self::InvariantViolation(violation)
    }

    /// Borrow the host error as its concrete type, if this is one.
    pub fn host_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Host(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Check whether this is an invariant violation.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
