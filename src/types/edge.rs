//! Edge kinds: how a child object is reached from its parent.

use serde::{Deserialize, Serialize};

/// Kind of edge between a parent object and one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Element of a list, tuple, set or other generic sequence.
    SequenceElement,
    /// Element of a numeric array.
    NumericArrayElement,
    /// Key of a mapping entry.
    MappingKey,
    /// Value of a mapping entry.
    MappingValue,
    /// Entry of an object's mutable attribute table.
    DynamicField,
    /// Declared, fixed field slot of an object.
    FixedField,
}

impl EdgeKind {
    /// All edge kinds, in declaration order.
    pub const ALL: [EdgeKind; 6] = [
        Self::SequenceElement,
        Self::NumericArrayElement,
        Self::MappingKey,
        Self::MappingValue,
        Self::DynamicField,
        Self::FixedField,
    ];

    /// Parse an edge kind from its display name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequence-element" => Some(Self::SequenceElement),
            "numeric-array-element" => Some(Self::NumericArrayElement),
            "mapping-key" => Some(Self::MappingKey),
            "mapping-value" => Some(Self::MappingValue),
            "dynamic-field" => Some(Self::DynamicField),
            "fixed-field" => Some(Self::FixedField),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SequenceElement => write!(f, "sequence-element"),
            Self::NumericArrayElement => write!(f, "numeric-array-element"),
            Self::MappingKey => write!(f, "mapping-key"),
            Self::MappingValue => write!(f, "mapping-value"),
            Self::DynamicField => write!(f, "dynamic-field"),
            Self::FixedField => write!(f, "fixed-field"),
        }
    }
}

/// Set of edge kinds a task is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EdgeKindSet(u8);

impl EdgeKindSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every edge kind.
    pub fn all() -> Self {
        Self::from_kinds(EdgeKind::ALL)
    }

    /// Build a set from a list of kinds.
    pub fn from_kinds(kinds: impl IntoIterator<Item = EdgeKind>) -> Self {
        kinds.into_iter().fold(Self::empty(), |set, kind| set.with(kind))
    }

    /// Return this set with `kind` added.
    pub fn with(self, kind: EdgeKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Union of two sets.
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether `kind` is in the set.
    pub fn contains(&self, kind: EdgeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = EdgeKind> + '_ {
        EdgeKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<EdgeKind> for EdgeKindSet {
    fn from_iter<I: IntoIterator<Item = EdgeKind>>(iter: I) -> Self {
        Self::from_kinds(iter)
    }
}
