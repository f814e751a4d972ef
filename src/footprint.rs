//! Entry points for size and overlap analyses.

use tracing::info;

use crate::config::FootprintConfig;
use crate::engine::Engine;
use crate::error::{InvariantViolation, TraversalError};
use crate::graph::ObjectGraph;
use crate::overlap::{OverlapMatrix, OverlapTask};
use crate::size::SizeTask;
use crate::task::Task;

/// Deduplicated byte footprint of one root.
///
/// Shared sub-structure is counted once and each cyclic back-edge costs
/// `config.pointer_word_size` bytes.
pub fn compute_size<G: ObjectGraph>(
    graph: &G,
    root: &G::Node,
    config: &FootprintConfig<G::Kind>,
) -> Result<u64, TraversalError> {
    let engine = Engine::new(graph, config.clone());
    let mut task = SizeTask::new(config.pointer_word_size);

    let traversal = engine.run(
        std::slice::from_ref(root),
        &mut [&mut task as &mut dyn Task<G, Conclusion = u64>],
    )?;
    let size = task.root_size(traversal.roots[0]).ok_or_else(|| {
        TraversalError::violation(InvariantViolation::MissingConclusion {
            task: "size",
            id: traversal.roots[0],
        })
    })?;

    info!(root = %traversal.roots[0], objects = traversal.session.len(), size, "computed size");
    Ok(size)
}

/// Pairwise shared footprint of `roots`, rows and columns in argument order.
///
/// The diagonal holds each root's own size; cell (i, j) holds the bytes
/// reachable from both roots, each shared node counted once.
pub fn compute_overlap<G: ObjectGraph>(
    graph: &G,
    roots: &[G::Node],
    config: &FootprintConfig<G::Kind>,
) -> Result<OverlapMatrix, TraversalError> {
    let engine = Engine::new(graph, config.clone());
    let mut task = OverlapTask::new(config.pointer_word_size);

    let traversal = engine.run(roots, &mut [&mut task as &mut dyn Task<G, Conclusion = u64>])?;
    let matrix = task.wrap_up(&traversal.session, &traversal.roots)?;

    info!(
        roots = matrix.len(),
        objects = traversal.session.len(),
        matrix_hash = %matrix.matrix_hash,
        "computed overlap"
    );
    Ok(matrix)
}
