//! Shared helpers for integration tests.

use object_footprint::{HeapGraph, HeapRef, ObjectGraph};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shallow size of a heap value.
pub fn shallow(heap: &HeapGraph, r: HeapRef) -> u64 {
    heap.shallow_size_of(&r).expect("live heap reference")
}
