use std::fmt;

/// Sparse feature index tested by a split node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(u32);

impl FeatureIndex {
    /// Create a new feature index.
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the raw feature index.
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` with the root at index 0 and children
/// referenced by [`NodeIndex`] rather than pointers. The builder pushes
/// parents before children, so every child index is strictly greater than
/// its parent's; the codec relies on that invariant to reject cyclic or
/// dangling arenas.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature tested by the split.
        feature: FeatureIndex,
        /// Samples with feature value < threshold go left, others right.
        /// An absent feature reads as `0.0`.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Number of bootstrap samples that reached this node during growth.
        n_samples: usize,
    },
    /// A terminal leaf node.
    Leaf {
        /// Mean target of the bootstrap samples routed here during growth.
        value: f64,
        /// Number of bootstrap samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the number of bootstrap samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
