//! In-memory object heap.
//!
//! `HeapGraph` is an arena of dynamically-typed values addressed by
//! [`HeapRef`] handles. Values may alias each other and form cycles through
//! the mutation helpers, which makes it a convenient host for exercising
//! the engine without a foreign runtime.
//!
//! ## Shallow size model
//!
//! Shallow sizes approximate a 64-bit dynamic runtime. Every container
//! charges one pointer per element slot; the elements themselves are
//! children and sized separately.
//!
//! | Value | Shallow bytes |
//! |-------|---------------|
//! | `None` | 16 |
//! | `Bool` | 28 |
//! | `Int` | 28, plus 4 per extra 30-bit digit |
//! | `Float` | 24 |
//! | `Text` | 49 + byte length |
//! | `Bytes` | 33 + byte length |
//! | `Range` | 48 |
//! | `Opaque` | declared size |
//! | `List` | 56 + 8 per element |
//! | `Tuple` | 40 + 8 per element |
//! | `Set` | 200 + 16 per element |
//! | `Array` | 112 + 8 per element |
//! | `Map` | 64 + 16 per entry |
//! | `Instance` | 48 + 8 per slot, plus 104 + 16 per field when it has an attribute table |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Child, ObjectGraph};
use crate::types::{EdgeKind, EdgeKindSet, ObjectId, TerminalKinds};

/// Handle to a value in a [`HeapGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HeapRef(usize);

impl HeapRef {
    /// Index into the heap arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag of a heap value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeapKind {
    /// Absent value.
    None,
    /// Boolean scalar.
    Bool,
    /// Integer scalar.
    Int,
    /// Float scalar.
    Float,
    /// Text scalar.
    Text,
    /// Binary scalar.
    Bytes,
    /// Integer range.
    Range,
    /// External blob.
    Opaque,
    /// Mutable sequence.
    List,
    /// Immutable sequence.
    Tuple,
    /// Unordered collection.
    Set,
    /// Numeric array.
    Array,
    /// Key/value mapping.
    Map,
    /// Class instance.
    Instance,
}

impl HeapKind {
    /// Scalars and blobs, which are never expanded.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::None
                | Self::Bool
                | Self::Int
                | Self::Float
                | Self::Text
                | Self::Bytes
                | Self::Range
                | Self::Opaque
        )
    }
}

/// A value stored in the heap.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapValue {
    /// Absent value.
    None,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Float scalar.
    Float(f64),
    /// Text scalar.
    Text(String),
    /// Binary scalar.
    Bytes(Vec<u8>),
    /// Half-open integer range.
    Range {
        /// First value.
        start: i64,
        /// One past the last value.
        end: i64,
    },
    /// External blob with a declared size.
    Opaque {
        /// Human label.
        label: String,
        /// Size in bytes.
        size: u64,
    },
    /// Mutable sequence.
    List(Vec<HeapRef>),
    /// Immutable sequence.
    Tuple(Vec<HeapRef>),
    /// Unordered collection, kept in insertion order.
    Set(Vec<HeapRef>),
    /// Numeric array whose elements are separate values.
    Array(Vec<HeapRef>),
    /// Mapping, kept in insertion order.
    Map(Vec<(HeapRef, HeapRef)>),
    /// Class instance with an optional attribute table and declared slots.
    Instance {
        /// Class name.
        class: String,
        /// Attribute table, `None` for slot-only classes.
        fields: Option<Vec<(String, HeapRef)>>,
        /// Declared slots; unset slots are skipped.
        slots: Vec<(String, Option<HeapRef>)>,
    },
}

impl HeapValue {
    /// Type tag.
    pub fn kind(&self) -> HeapKind {
        match self {
            Self::None => HeapKind::None,
            Self::Bool(_) => HeapKind::Bool,
            Self::Int(_) => HeapKind::Int,
            Self::Float(_) => HeapKind::Float,
            Self::Text(_) => HeapKind::Text,
            Self::Bytes(_) => HeapKind::Bytes,
            Self::Range { .. } => HeapKind::Range,
            Self::Opaque { .. } => HeapKind::Opaque,
            Self::List(_) => HeapKind::List,
            Self::Tuple(_) => HeapKind::Tuple,
            Self::Set(_) => HeapKind::Set,
            Self::Array(_) => HeapKind::Array,
            Self::Map(_) => HeapKind::Map,
            Self::Instance { .. } => HeapKind::Instance,
        }
    }

    /// Shallow size in bytes.
    pub fn shallow_size(&self) -> u64 {
        match self {
            Self::None => 16,
            Self::Bool(_) => 28,
            Self::Int(v) => {
                let bits = 64 - v.unsigned_abs().leading_zeros() as u64;
                let digits = bits.div_ceil(30).max(1);
                24 + 4 * digits
            }
            Self::Float(_) => 24,
            Self::Text(s) => 49 + s.len() as u64,
            Self::Bytes(b) => 33 + b.len() as u64,
            Self::Range { .. } => 48,
            Self::Opaque { size, .. } => *size,
            Self::List(items) => 56 + 8 * items.len() as u64,
            Self::Tuple(items) => 40 + 8 * items.len() as u64,
            Self::Set(items) => 200 + 16 * items.len() as u64,
            Self::Array(items) => 112 + 8 * items.len() as u64,
            Self::Map(entries) => 64 + 16 * entries.len() as u64,
            Self::Instance { fields, slots, .. } => {
                let table = fields
                    .as_ref()
                    .map(|f| 104 + 16 * f.len() as u64)
                    .unwrap_or(0);
                48 + 8 * slots.len() as u64 + table
            }
        }
    }
}

/// Error type for heap operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    /// Handle does not point into this heap.
    #[error("Dangling heap reference: {0}")]
    DanglingRef(HeapRef),
    /// Operation needs a different kind of value.
    #[error("Value {r} is a {kind:?}, expected {expected}")]
    WrongKind {
        /// Target value.
        r: HeapRef,
        /// Its actual kind.
        kind: HeapKind,
        /// What the operation needed.
        expected: &'static str,
    },
    /// Sequence index out of range.
    #[error("Index {index} out of range for {r} of length {len}")]
    IndexOutOfRange {
        /// Target sequence.
        r: HeapRef,
        /// Requested index.
        index: usize,
        /// Sequence length.
        len: usize,
    },
    /// Instance has no attribute table.
    #[error("Instance {0} has no attribute table")]
    NoAttributeTable(HeapRef),
    /// Slot name not declared by the instance.
    #[error("Instance {r} declares no slot named {name}")]
    UnknownSlot {
        /// Target instance.
        r: HeapRef,
        /// Requested slot.
        name: String,
    },
}

/// Arena of heap values.
#[derive(Debug, Clone, Default)]
pub struct HeapGraph {
    values: Vec<HeapValue>,
}

impl HeapGraph {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its handle.
    pub fn alloc(&mut self, value: HeapValue) -> HeapRef {
        self.values.push(value);
        HeapRef(self.values.len() - 1)
    }

    /// Allocate `None`.
    pub fn none(&mut self) -> HeapRef {
        self.alloc(HeapValue::None)
    }

    /// Allocate a boolean.
    pub fn boolean(&mut self, v: bool) -> HeapRef {
        self.alloc(HeapValue::Bool(v))
    }

    /// Allocate an integer.
    pub fn int(&mut self, v: i64) -> HeapRef {
        self.alloc(HeapValue::Int(v))
    }

    /// Allocate a float.
    pub fn float(&mut self, v: f64) -> HeapRef {
        self.alloc(HeapValue::Float(v))
    }

    /// Allocate a text value.
    pub fn text(&mut self, s: &str) -> HeapRef {
        self.alloc(HeapValue::Text(s.to_string()))
    }

    /// Allocate a binary value.
    pub fn bytes(&mut self, b: &[u8]) -> HeapRef {
        self.alloc(HeapValue::Bytes(b.to_vec()))
    }

    /// Allocate an opaque blob.
    pub fn opaque(&mut self, label: &str, size: u64) -> HeapRef {
        self.alloc(HeapValue::Opaque { label: label.to_string(), size })
    }

    /// Allocate a list.
    pub fn list(&mut self, items: Vec<HeapRef>) -> HeapRef {
        self.alloc(HeapValue::List(items))
    }

    /// Allocate a tuple.
    pub fn tuple(&mut self, items: Vec<HeapRef>) -> HeapRef {
        self.alloc(HeapValue::Tuple(items))
    }

    /// Allocate a set.
    pub fn set(&mut self, items: Vec<HeapRef>) -> HeapRef {
        self.alloc(HeapValue::Set(items))
    }

    /// Allocate a numeric array with freshly allocated float elements.
    pub fn array(&mut self, values: &[f64]) -> HeapRef {
        let items = values.iter().map(|v| self.float(*v)).collect();
        self.alloc(HeapValue::Array(items))
    }

    /// Allocate a mapping.
    pub fn map(&mut self, entries: Vec<(HeapRef, HeapRef)>) -> HeapRef {
        self.alloc(HeapValue::Map(entries))
    }

    /// Allocate an instance with an empty attribute table.
    pub fn instance(&mut self, class: &str) -> HeapRef {
        self.alloc(HeapValue::Instance {
            class: class.to_string(),
            fields: Some(Vec::new()),
            slots: Vec::new(),
        })
    }

    /// Allocate a slot-only instance with all slots unset.
    pub fn slotted(&mut self, class: &str, slot_names: &[&str]) -> HeapRef {
        self.alloc(HeapValue::Instance {
            class: class.to_string(),
            fields: None,
            slots: slot_names.iter().map(|n| (n.to_string(), None)).collect(),
        })
    }

    /// Look up a value.
    pub fn get(&self, r: HeapRef) -> Result<&HeapValue, HeapError> {
        self.values.get(r.0).ok_or(HeapError::DanglingRef(r))
    }

    fn get_mut(&mut self, r: HeapRef) -> Result<&mut HeapValue, HeapError> {
        self.values.get_mut(r.0).ok_or(HeapError::DanglingRef(r))
    }

    /// Append to a list, set or array.
    pub fn push(&mut self, seq: HeapRef, child: HeapRef) -> Result<(), HeapError> {
        match self.get_mut(seq)? {
            HeapValue::List(items) | HeapValue::Set(items) | HeapValue::Array(items) => {
                items.push(child);
                Ok(())
            }
            other => Err(HeapError::WrongKind { r: seq, kind: other.kind(), expected: "growable sequence" }),
        }
    }

    /// Replace an element of any sequence.
    pub fn set_item(&mut self, seq: HeapRef, index: usize, child: HeapRef) -> Result<(), HeapError> {
        match self.get_mut(seq)? {
            HeapValue::List(items)
            | HeapValue::Tuple(items)
            | HeapValue::Set(items)
            | HeapValue::Array(items) => {
                let len = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or(HeapError::IndexOutOfRange { r: seq, index, len })?;
                *slot = child;
                Ok(())
            }
            other => Err(HeapError::WrongKind { r: seq, kind: other.kind(), expected: "sequence" }),
        }
    }

    /// Insert or replace a mapping entry. Keys are matched by identity.
    pub fn insert(&mut self, map: HeapRef, key: HeapRef, value: HeapRef) -> Result<(), HeapError> {
        match self.get_mut(map)? {
            HeapValue::Map(entries) => {
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
                Ok(())
            }
            other => Err(HeapError::WrongKind { r: map, kind: other.kind(), expected: "mapping" }),
        }
    }

    /// Set an attribute in an instance's attribute table.
    pub fn set_field(&mut self, obj: HeapRef, name: &str, value: HeapRef) -> Result<(), HeapError> {
        match self.get_mut(obj)? {
            HeapValue::Instance { fields: Some(fields), .. } => {
                match fields.iter_mut().find(|(n, _)| n == name) {
                    Some(field) => field.1 = value,
                    None => fields.push((name.to_string(), value)),
                }
                Ok(())
            }
            HeapValue::Instance { fields: None, .. } => Err(HeapError::NoAttributeTable(obj)),
            other => Err(HeapError::WrongKind { r: obj, kind: other.kind(), expected: "instance" }),
        }
    }

    /// Set a declared slot.
    pub fn set_slot(&mut self, obj: HeapRef, name: &str, value: HeapRef) -> Result<(), HeapError> {
        match self.get_mut(obj)? {
            HeapValue::Instance { slots, .. } => {
                let slot = slots
                    .iter_mut()
                    .find(|(n, _)| n == name)
                    .ok_or_else(|| HeapError::UnknownSlot { r: obj, name: name.to_string() })?;
                slot.1 = Some(value);
                Ok(())
            }
            other => Err(HeapError::WrongKind { r: obj, kind: other.kind(), expected: "instance" }),
        }
    }

    /// Number of allocated values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the heap is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ObjectGraph for HeapGraph {
    type Node = HeapRef;
    type Kind = HeapKind;
    type Error = HeapError;

    fn identity_of(&self, node: &HeapRef) -> ObjectId {
        ObjectId::new(node.0 as u64)
    }

    fn same_object(&self, a: &HeapRef, b: &HeapRef) -> bool {
        a == b
    }

    fn kind_of(&self, node: &HeapRef) -> HeapKind {
        self.values.get(node.0).map(HeapValue::kind).unwrap_or(HeapKind::Opaque)
    }

    fn shallow_size_of(&self, node: &HeapRef) -> Result<u64, HeapError> {
        Ok(self.get(*node)?.shallow_size())
    }

    fn children_of(
        &self,
        node: &HeapRef,
        interests: EdgeKindSet,
    ) -> Result<Vec<Child<HeapRef>>, HeapError> {
        let mut children = Vec::new();
        let mut add = |kind: EdgeKind, child: HeapRef| {
            if interests.contains(kind) {
                children.push(Child::new(kind, child));
            }
        };

        match self.get(*node)? {
            HeapValue::List(items) | HeapValue::Tuple(items) | HeapValue::Set(items) => {
                for item in items {
                    add(EdgeKind::SequenceElement, *item);
                }
            }
            HeapValue::Array(items) => {
                for item in items {
                    add(EdgeKind::NumericArrayElement, *item);
                }
            }
            HeapValue::Map(entries) => {
                for (key, value) in entries {
                    add(EdgeKind::MappingKey, *key);
                    add(EdgeKind::MappingValue, *value);
                }
            }
            HeapValue::Instance { fields, slots, .. } => {
                for (_, value) in fields.iter().flatten() {
                    add(EdgeKind::DynamicField, *value);
                }
                for value in slots.iter().filter_map(|(_, v)| *v) {
                    add(EdgeKind::FixedField, value);
                }
            }
            _ => {}
        }

        Ok(children)
    }

    fn is_builtin_terminal(&self, node: &HeapRef) -> bool {
        self.get(*node).map(|v| v.kind().is_scalar()).unwrap_or(false)
    }

    fn is_terminal(&self, node: &HeapRef, extra: &TerminalKinds<HeapKind>) -> bool {
        // Dangling handles are expanded so children_of reports them.
        match self.get(*node) {
            Ok(value) => value.kind().is_scalar() || extra.contains(&value.kind()),
            Err(_) => false,
        }
    }
}
