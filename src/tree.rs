use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::MaxFeatures;
use crate::node::{Node, NodeIndex};
use crate::sample::Sample;
use crate::split::{SplitMethod, find_best_split, sse};

/// Growth parameters for a single regression tree.
///
/// Built internally by the forest from its [`crate::ForestConfig`]; the
/// per-tree `seed` is what makes two trees of the same ensemble differ.
#[derive(Debug, Clone)]
pub(crate) struct TreeConfig {
    pub(crate) split_method: SplitMethod,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) seed: u64,
}

impl TreeConfig {
    /// Grow a tree on the provided sample view (typically a bootstrap draw).
    ///
    /// Growth is deterministic given the samples and the seed. An empty
    /// view yields an empty tree.
    pub(crate) fn grow(&self, samples: &[&Sample]) -> Tree {
        if samples.is_empty() {
            return Tree { nodes: Vec::new() };
        }

        let indices: Vec<usize> = (0..samples.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();

        build_node(samples, &indices, self, 0, &mut rng, &mut arena);

        Tree { nodes: arena }
    }
}

/// Recursively build the arena-based tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`. Parents
/// are pushed before their children, so child indices are always strictly
/// greater than the parent's.
fn build_node(
    samples: &[&Sample],
    indices: &[usize],
    config: &TreeConfig,
    depth: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = indices.len();

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &i in indices {
        let y = samples[i].target();
        sum += y;
        sum_sq += y * y;
    }
    let node_sse = sse(sum, sum_sq, n_samples);
    let mean = sum / n_samples as f64;

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf {
            value: mean,
            n_samples,
        });
        NodeIndex::new(idx)
    };

    // Stopping conditions.
    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = n_samples < config.min_samples_split;
    let pure = node_sse <= f64::EPSILON;

    if too_few || pure || depth_exceeded {
        return make_leaf(arena);
    }

    let split_result = find_best_split(
        samples,
        indices,
        config.split_method,
        config.max_features,
        config.min_samples_leaf,
        rng,
    );

    let split = match split_result {
        Some(s) => s,
        None => return make_leaf(arena),
    };

    // Arena pattern: reserve index, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        value: mean,
        n_samples,
    });

    let left_idx = build_node(samples, &split.left_indices, config, depth + 1, rng, arena);
    let right_idx = build_node(samples, &split.right_indices, config, depth + 1, rng, arena);

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: left_idx,
        right: right_idx,
        n_samples,
    };

    NodeIndex::new(node_idx)
}

/// A grown regression tree.
///
/// Stored as an arena-based `Vec<Node>` with index references for
/// cache-friendly traversal and trivial serialization. A tree grown from
/// zero samples has an empty arena and no prediction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
}

impl Tree {
    /// An ungrown tree with no nodes.
    pub(crate) fn empty() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Predict the target value for a sparse feature map.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// the sample's feature value is `< threshold`, right otherwise. An
    /// absent feature index reads as `0.0`, the same rule growth used, so
    /// every sample has a defined path. Returns `f64::NAN` for an empty
    /// (never-grown) tree.
    #[must_use]
    pub fn infer(&self, features: &BTreeMap<u32, f64>) -> f64 {
        if self.nodes.is_empty() {
            return f64::NAN;
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let value = features.get(&feature.index()).copied().unwrap_or(0.0);
                    if value < *threshold {
                        idx = left.index();
                    } else {
                        idx = right.index();
                    }
                }
            }
        }
    }

    /// Return the total number of nodes (both splits and leaves).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0, as does an empty
    /// tree. Uses an iterative BFS approach.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => {
                    if d > max_depth {
                        max_depth = d;
                    }
                }
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Check the arena invariants: every split child is in range and
    /// strictly after its parent. Guarantees traversal terminates at a
    /// leaf, so the codec rejects arenas that fail this.
    pub(crate) fn is_well_formed(&self) -> bool {
        let len = self.nodes.len();
        self.nodes.iter().enumerate().all(|(idx, node)| match node {
            Node::Leaf { .. } => true,
            Node::Split {
                threshold,
                left,
                right,
                ..
            } => {
                threshold.is_finite()
                    && left.index() > idx
                    && right.index() > idx
                    && left.index() < len
                    && right.index() < len
            }
        })
    }
}
