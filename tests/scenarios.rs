//! End-to-end size and overlap scenarios.
//!
//! These tests pin down the footprint contract through the public API:
//! 1. Cycle termination and back-edge charging
//! 2. Alias deduplication within one root
//! 3. Cross-root overlap with nested sharing
//! 4. Matrix symmetry, diagonal and determinism on a mixed object set

mod common;

use common::{init_tracing, shallow};
use object_footprint::{
    compute_overlap, compute_size, Engine, FootprintConfig, HeapGraph, HeapKind, HeapRef,
    ObjectGraph, OverlapTask, SizeTask, Task, TraversalError,
};

fn config() -> FootprintConfig<HeapKind> {
    FootprintConfig::default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Size
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_self_referential_list() {
    init_tracing();
    let mut heap = HeapGraph::new();
    let list = heap.list(vec![]);
    heap.push(list, list).unwrap();

    let size = compute_size(&heap, &list, &config()).unwrap();
    assert_eq!(size, shallow(&heap, list) + 8);
}

#[test]
fn test_three_node_cycle_charges_one_back_edge() {
    init_tracing();
    let mut heap = HeapGraph::new();
    let x = heap.list(vec![]);
    let y = heap.list(vec![]);
    let z = heap.list(vec![]);
    heap.push(x, y).unwrap();
    heap.push(y, z).unwrap();
    heap.push(z, x).unwrap();

    let size = compute_size(&heap, &x, &config()).unwrap();
    assert_eq!(size, shallow(&heap, x) + shallow(&heap, y) + shallow(&heap, z) + 8);
}

#[test]
fn test_instance_cycle_through_fields_and_slots() {
    let mut heap = HeapGraph::new();
    let a = heap.instance("Looper");
    let b = heap.slotted("SlotLooper", &["next"]);
    heap.set_field(a, "next", b).unwrap();
    heap.set_slot(b, "next", a).unwrap();

    let size = compute_size(&heap, &a, &config()).unwrap();
    assert_eq!(size, shallow(&heap, a) + shallow(&heap, b) + 8);
}

#[test]
fn test_shared_leaf_within_one_root_counted_once() {
    let mut heap = HeapGraph::new();
    let leaf = heap.bytes(&[0u8; 100]);
    let left = heap.tuple(vec![leaf]);
    let right = heap.tuple(vec![leaf]);
    let root = heap.list(vec![left, right]);

    let size = compute_size(&heap, &root, &config()).unwrap();
    assert_eq!(
        size,
        shallow(&heap, root) + shallow(&heap, left) + shallow(&heap, right) + shallow(&heap, leaf)
    );
}

#[test]
fn test_opaque_blob_uses_declared_size() {
    let mut heap = HeapGraph::new();
    let blob = heap.opaque("mmap", 4096);
    let root = heap.list(vec![blob]);

    let size = compute_size(&heap, &root, &config()).unwrap();
    assert_eq!(size, shallow(&heap, root) + 4096);
}

#[test]
fn test_pointer_word_size_is_configurable() {
    let mut heap = HeapGraph::new();
    let list = heap.list(vec![]);
    heap.push(list, list).unwrap();

    let size = compute_size(&heap, &list, &config().with_pointer_word_size(4)).unwrap();
    assert_eq!(size, shallow(&heap, list) + 4);
}

// ─────────────────────────────────────────────────────────────────────────────
// Overlap
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_overlap_of_shared_tuple() {
    init_tracing();
    let mut heap = HeapGraph::new();
    let seven = heap.int(7);
    let eight = heap.int(8);
    let a = heap.tuple(vec![seven, eight]);
    let one = heap.int(1);
    let two = heap.int(2);
    let p = heap.list(vec![one, a]);
    let q = heap.list(vec![a, two]);

    let size_a = compute_size(&heap, &a, &config()).unwrap();
    let matrix = compute_overlap(&heap, &[p, q], &config()).unwrap();

    assert_eq!(matrix.get(0, 1), Some(size_a));
    assert_eq!(matrix.get(0, 0), Some(shallow(&heap, p) + shallow(&heap, one) + size_a));
}

#[test]
fn test_nested_sharing_counted_once() {
    let mut heap = HeapGraph::new();
    let payload = heap.text("payload");
    let inner = heap.list(vec![payload]);
    let mid1 = heap.list(vec![inner]);
    let mid2 = heap.list(vec![inner]);
    let outer = heap.list(vec![mid1, mid2]);
    let other = heap.tuple(vec![inner]);

    let size_inner = compute_size(&heap, &inner, &config()).unwrap();
    let matrix = compute_overlap(&heap, &[outer, other], &config()).unwrap();

    assert_eq!(matrix.get(0, 1), Some(size_inner));
}

#[test]
fn test_shared_structure_with_internal_sharing() {
    // S aliases u twice internally; only S itself is shared between A and B
    let mut heap = HeapGraph::new();
    let u = heap.text("u");
    let wrapper = heap.list(vec![u]);
    let s = heap.list(vec![u, wrapper]);
    let key = heap.text("k");
    let a = heap.list(vec![s]);
    let b = heap.map(vec![(key, s)]);

    let size_s = compute_size(&heap, &s, &config()).unwrap();
    assert_eq!(size_s, shallow(&heap, s) + shallow(&heap, u) + shallow(&heap, wrapper));

    let matrix = compute_overlap(&heap, &[a, b], &config()).unwrap();
    assert_eq!(matrix.get(0, 1), Some(size_s));
}

#[test]
fn test_terminal_kinds_apply_to_overlap() {
    let mut heap = HeapGraph::new();
    let leaf = heap.int(1);
    let shared = heap.tuple(vec![leaf]);
    let p = heap.list(vec![shared]);
    let q = heap.list(vec![shared]);

    let cut = config().with_terminal_kinds([HeapKind::Tuple]);
    let matrix = compute_overlap(&heap, &[p, q], &cut).unwrap();

    // The tuple is opaque to the engine: only its shallow size is shared
    assert_eq!(matrix.get(0, 1), Some(shallow(&heap, shared)));
}

#[test]
fn test_engine_run_with_overlap_task_directly() {
    let mut heap = HeapGraph::new();
    let leaf = heap.float(0.5);
    let p = heap.list(vec![leaf]);
    let q = heap.set(vec![leaf]);

    let engine = Engine::new(&heap, config());
    let mut overlap = OverlapTask::new(8);
    let mut size = SizeTask::new(8);
    let traversal = engine
        .run(
            &[p, q],
            &mut [
                &mut overlap as &mut dyn Task<HeapGraph, Conclusion = u64>,
                &mut size,
            ],
        )
        .unwrap();

    // Both tasks share one session and agree on every root
    assert_eq!(traversal.conclusions[0], traversal.conclusions[1]);

    let matrix = overlap.wrap_up(&traversal.session, &traversal.roots).unwrap();
    assert_eq!(matrix.diagonal(), traversal.conclusions[1]);
    assert_eq!(matrix.get(0, 1), Some(24));
}

#[test]
fn test_host_error_aborts_overlap() {
    let heap = HeapGraph::new();
    let mut other = HeapGraph::new();
    let dangling = other.list(vec![]);

    let err = compute_overlap(&heap, &[dangling], &config()).unwrap_err();
    assert!(matches!(err, TraversalError::Host(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Mixed object set
// ─────────────────────────────────────────────────────────────────────────────

struct Zoo {
    heap: HeapGraph,
    roots: Vec<HeapRef>,
    a: HeapRef,
    b: HeapRef,
}

/// Shared tuples and mappings, a long list of one repeated value, and
/// reference cycles through attribute tables and containers.
fn build_zoo() -> Zoo {
    let mut heap = HeapGraph::new();

    let seven = heap.int(7);
    let eight = heap.int(8);
    let nine = heap.int(9);
    let pair = heap.tuple(vec![seven, eight]);
    let a = heap.tuple(vec![pair, nine]);

    let hey = heap.text("hey");
    let mut entries = Vec::new();
    for idx in 0..28u8 {
        let c = ((b'a' + idx % 26) as char).to_string();
        let k = heap.text(&c);
        let v = heap.text(&c);
        entries.push((k, v));
    }
    let letters = heap.map(entries);
    let b = heap.list(vec![hey, letters]);

    let (one, two, three) = (heap.int(1), heap.int(2), heap.int(3));
    let inner = heap.list(vec![two, three, a]);
    let obj1 = heap.list(vec![one, inner]);

    let (four, five) = (heap.int(4), heap.int(5));
    let obj2 = heap.list(vec![four, a, five, b]);

    let (ten, eleven, twelve) = (heap.int(10), heap.int(11), heap.int(12));
    let tail = heap.tuple(vec![b, twelve]);
    let obj3 = heap.tuple(vec![ten, eleven, tail]);

    let shared_one = heap.int(1);
    let long_list = heap.list(vec![shared_one; 100]);

    let looper1 = heap.instance("Looper");
    let looper2 = heap.instance("Looper");
    let looper3 = heap.instance("Looper");
    heap.set_field(looper1, "a", looper2).unwrap();
    heap.set_field(looper2, "a", looper3).unwrap();
    heap.set_field(looper3, "a", looper1).unwrap();

    let cont_two = heap.int(2);
    let mut items = vec![shared_one, cont_two, looper2];
    items.extend(std::iter::repeat(shared_one).take(100));
    let cont_looper1 = heap.list(items);
    let four_b = heap.int(4);
    let two_b = heap.int(2);
    let cont_looper2 = heap.list(vec![two_b, cont_looper1]);
    let cont_looper3 = heap.list(vec![four_b, cont_looper2]);
    heap.set_item(cont_looper1, 1, cont_looper3).unwrap();

    Zoo {
        roots: vec![obj1, obj2, obj3, long_list, looper1, cont_looper1],
        heap,
        a,
        b,
    }
}

#[test]
fn test_zoo_matrix_properties() {
    init_tracing();
    let zoo = build_zoo();
    let matrix = compute_overlap(&zoo.heap, &zoo.roots, &config()).unwrap();
    let n = zoo.roots.len();

    for i in 0..n {
        let own = compute_size(&zoo.heap, &zoo.roots[i], &config()).unwrap();
        assert_eq!(matrix.get(i, i), Some(own), "diagonal {i}");
        for j in 0..n {
            assert_eq!(matrix.get(i, j), matrix.get(j, i), "symmetry ({i}, {j})");
        }
    }
}

#[test]
fn test_zoo_shared_objects() {
    let zoo = build_zoo();
    let matrix = compute_overlap(&zoo.heap, &zoo.roots, &config()).unwrap();
    let size_a = compute_size(&zoo.heap, &zoo.a, &config()).unwrap();
    let size_b = compute_size(&zoo.heap, &zoo.b, &config()).unwrap();

    // obj1 ∩ obj2 = a, obj2 ∩ obj3 = b, obj1 ∩ obj3 = ∅
    assert_eq!(matrix.get(0, 1), Some(size_a));
    assert_eq!(matrix.get(1, 2), Some(size_b));
    assert_eq!(matrix.get(0, 2), Some(0));

    // long_list and cont_looper1 share the repeated integer only
    assert_eq!(matrix.get(3, 5), Some(28));

    // cont_looper1 reaches the whole looper cycle
    assert_eq!(matrix.get(4, 5), matrix.get(4, 4));

    let looper1 = zoo.roots[4];
    let looper_cycle = 3 * shallow(&zoo.heap, looper1) + 8;
    assert_eq!(matrix.get(4, 4), Some(looper_cycle));
}

#[test]
fn test_zoo_is_deterministic() {
    let zoo = build_zoo();
    let first = compute_overlap(&zoo.heap, &zoo.roots, &config()).unwrap();
    let second = compute_overlap(&zoo.heap, &zoo.roots, &config()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.matrix_hash, second.matrix_hash);
}

#[test]
fn test_long_list_of_one_value() {
    let zoo = build_zoo();
    let long_list = zoo.roots[3];
    let size = compute_size(&zoo.heap, &long_list, &config()).unwrap();

    assert_eq!(zoo.heap.shallow_size_of(&long_list).unwrap(), 56 + 800);
    assert_eq!(size, 56 + 800 + 28);
}
