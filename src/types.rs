//! Type-safe wrappers for lattice nodes and the small enums shared by the analysis.
//!
//! States are plain indices into the model's state set. Nodes of the lattice
//! are addressed through [`NodeId`], which is distinct from a state index so
//! that the two can never be confused.
use std::fmt;

/// A state of the model (0-indexed).
pub type State = usize;

/// Index of a lattice node in the order's node arena.
///
/// # Invariants
///
/// - A `NodeId` is only meaningful for the order that issued it (and its clones)
/// - Merged nodes leave a hole in the arena; their id is never reused
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a node id from an arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit into `u32`.
    pub fn new(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "Node index {} does not fit into u32", index);
        NodeId(index as u32)
    }

    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<NodeId> for usize {
    fn from(node: NodeId) -> Self {
        node.index()
    }
}

/// Outcome of comparing the values of two states (or nodes).
///
/// `Above` means the first operand's value is proven to be at least the second's.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Comparison {
    Above,
    Below,
    Same,
    Unknown,
}

impl Comparison {
    /// Swaps the roles of the two operands.
    pub fn invert(self) -> Self {
        match self {
            Comparison::Above => Comparison::Below,
            Comparison::Below => Comparison::Above,
            other => other,
        }
    }

    /// Returns true if the relation is known.
    pub fn is_known(self) -> bool {
        self != Comparison::Unknown
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Above => "above",
            Comparison::Below => "below",
            Comparison::Same => "same",
            Comparison::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Optimization direction of a property over a nondeterministic model.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Returns true for [`Direction::Maximize`].
    pub fn is_max(self) -> bool {
        self == Direction::Maximize
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Maximize => write!(f, "max"),
            Direction::Minimize => write!(f, "min"),
        }
    }
}
