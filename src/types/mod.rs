//! Core types for the footprint engine.

pub mod identity;
pub mod edge;
pub mod terminal;

pub use identity::ObjectId;
pub use edge::{EdgeKind, EdgeKindSet};
pub use terminal::TerminalKinds;
