//! Property tests over randomly generated object graphs.
//!
//! Graphs mix list containers, which may alias each other and form cycles,
//! with integer leaves.

mod common;

use std::collections::HashSet;

use common::shallow;
use object_footprint::{
    compute_overlap, compute_size, EdgeKindSet, FootprintConfig, HeapGraph, HeapKind, HeapRef, ObjectGraph,
};
use proptest::prelude::*;

/// Container count, adjacency per container and root indices.
#[derive(Debug, Clone)]
struct Shape {
    lists: usize,
    leaves: usize,
    edges: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

fn shape() -> impl Strategy<Value = Shape> {
    (1usize..10, 0usize..6).prop_flat_map(|(lists, leaves)| {
        let total = lists + leaves;
        (
            prop::collection::vec(prop::collection::vec(0..total, 0..4), lists),
            prop::collection::vec(0..total, 1..5),
        )
            .prop_map(move |(edges, roots)| Shape { lists, leaves, edges, roots })
    })
}

fn build(shape: &Shape) -> (HeapGraph, Vec<HeapRef>) {
    let mut heap = HeapGraph::new();
    let mut nodes: Vec<HeapRef> = (0..shape.lists).map(|_| heap.list(vec![])).collect();
    nodes.extend((0..shape.leaves).map(|i| heap.int(i as i64)));

    for (from, targets) in shape.edges.iter().enumerate() {
        for to in targets {
            heap.push(nodes[from], nodes[*to]).expect("list container");
        }
    }

    let roots = shape.roots.iter().map(|i| nodes[*i]).collect();
    (heap, roots)
}

/// Straightforward recursive size: every distinct reachable node once, plus
/// one pointer word per DFS back-edge.
fn reference_size(heap: &HeapGraph, root: HeapRef, word: u64) -> u64 {
    fn visit(
        heap: &HeapGraph,
        node: HeapRef,
        word: u64,
        visited: &mut HashSet<HeapRef>,
        on_path: &mut HashSet<HeapRef>,
    ) -> u64 {
        visited.insert(node);
        on_path.insert(node);

        let mut total = shallow(heap, node);
        for child in heap.children_of(&node, EdgeKindSet::all()).unwrap() {
            if on_path.contains(&child.node) {
                total += word;
            } else if !visited.contains(&child.node) {
                total += visit(heap, child.node, word, visited, on_path);
            }
        }

        on_path.remove(&node);
        total
    }

    visit(heap, root, word, &mut HashSet::new(), &mut HashSet::new())
}

fn config() -> FootprintConfig<HeapKind> {
    FootprintConfig::default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn overlap_is_deterministic(shape in shape()) {
        let (heap, roots) = build(&shape);
        let first = compute_overlap(&heap, &roots, &config()).unwrap();
        let second = compute_overlap(&heap, &roots, &config()).unwrap();

        prop_assert_eq!(&first.sizes, &second.sizes);
        prop_assert_eq!(first.matrix_hash, second.matrix_hash);
    }

    #[test]
    fn overlap_is_symmetric(shape in shape()) {
        let (heap, roots) = build(&shape);
        let matrix = compute_overlap(&heap, &roots, &config()).unwrap();

        for i in 0..roots.len() {
            for j in 0..roots.len() {
                prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn diagonal_matches_standalone_size(shape in shape()) {
        let (heap, roots) = build(&shape);
        let matrix = compute_overlap(&heap, &roots, &config()).unwrap();

        for (i, root) in roots.iter().enumerate() {
            let own = compute_size(&heap, root, &config()).unwrap();
            prop_assert_eq!(matrix.get(i, i), Some(own));
        }
    }

    #[test]
    fn size_matches_reference_walk(shape in shape(), word in 1u64..64) {
        let (heap, roots) = build(&shape);
        let config = config().with_pointer_word_size(word);

        for root in &roots {
            let size = compute_size(&heap, root, &config).unwrap();
            prop_assert_eq!(size, reference_size(&heap, *root, word));
        }
    }

    #[test]
    fn size_covers_root_shallow_size(shape in shape()) {
        let (heap, roots) = build(&shape);

        for root in &roots {
            let size = compute_size(&heap, root, &config()).unwrap();
            prop_assert!(size >= shallow(&heap, *root));
        }
    }

    #[test]
    fn pointer_word_size_only_affects_cycles(shape in shape(), word in 1u64..64) {
        let (heap, roots) = build(&shape);
        let root = roots[0];

        let default = compute_size(&heap, &root, &config()).unwrap();
        let custom = compute_size(&heap, &root, &config().with_pointer_word_size(word)).unwrap();

        // Both runs take the same back-edges, so sizes differ by a whole
        // number of pointer-size deltas
        let (lo, hi) = (default.min(custom), default.max(custom));
        let delta = word.abs_diff(8);
        if delta == 0 {
            prop_assert_eq!(default, custom);
        } else {
            prop_assert_eq!((hi - lo) % delta, 0);
        }
    }
}
