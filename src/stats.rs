//! JSON introspection: ensemble structure and aggregate statistics.

use serde_json::{Value, json};

use crate::forest::Forest;
use crate::node::Node;
use crate::tree::Tree;

/// Aggregate statistics for one tree.
#[derive(Debug, Clone, serde::Serialize)]
struct TreeStats {
    depth: usize,
    node_count: usize,
    leaf_count: usize,
}

/// Aggregate statistics for the whole forest.
#[derive(Debug, Clone, serde::Serialize)]
struct ForestStats {
    sample_count: usize,
    pending_adds: usize,
    pending_removals: usize,
    tree_count: usize,
    trees: Vec<TreeStats>,
}

/// Render one arena node (and its subtree) as a JSON value.
fn node_json(tree: &Tree, idx: usize) -> Value {
    match &tree.nodes[idx] {
        Node::Leaf { value, n_samples } => json!({
            "value": value,
            "samples": n_samples,
        }),
        Node::Split {
            feature,
            threshold,
            left,
            right,
            n_samples,
        } => json!({
            "feature": feature.index(),
            "threshold": threshold,
            "samples": n_samples,
            "left": node_json(tree, left.index()),
            "right": node_json(tree, right.index()),
        }),
    }
}

fn tree_json(tree: &Tree) -> Value {
    if tree.nodes.is_empty() {
        Value::Null
    } else {
        node_json(tree, 0)
    }
}

impl Forest {
    /// Render the committed ensemble structure as a JSON string.
    ///
    /// Each tree is a nested split/leaf object rooted at its root node;
    /// ungrown trees render as `null`. Intended for human inspection and
    /// debugging; the shape is not a stable interface and is not suited
    /// for lossless persistence (use [`to_bytes`](Forest::to_bytes)).
    #[must_use]
    pub fn as_json(&self) -> String {
        let value = json!({
            "tree_count": self.tree_count,
            "trees": self.trees.iter().map(tree_json).collect::<Vec<_>>(),
        });
        serde_json::to_string(&value).expect("serialization cannot fail")
    }

    /// Render aggregate counters (sample counts, per-tree depth and node
    /// tallies) as a JSON string.
    #[must_use]
    pub fn stats_json(&self) -> String {
        let stats = ForestStats {
            sample_count: self.sample_count(),
            pending_adds: self.store.staged_add_count(),
            pending_removals: self.store.staged_removal_count(),
            tree_count: self.tree_count,
            trees: self
                .trees
                .iter()
                .map(|t| TreeStats {
                    depth: t.depth(),
                    node_count: t.node_count(),
                    leaf_count: t.leaf_count(),
                })
                .collect(),
        };
        serde_json::to_string(&stats).expect("serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::Value;

    use crate::Forest;

    fn features(pairs: &[(u32, f64)]) -> BTreeMap<u32, f64> {
        pairs.iter().copied().collect()
    }

    fn trained_forest() -> Forest {
        let mut forest = Forest::new(3).unwrap();
        for i in 0..20 {
            forest
                .add(format!("s{i}"), features(&[(0, i as f64)]), (i % 4) as f64)
                .unwrap();
        }
        forest.commit();
        forest
    }

    #[test]
    fn structure_json_parses_and_has_all_trees() {
        let forest = trained_forest();
        let parsed: Value = serde_json::from_str(&forest.as_json()).unwrap();

        assert_eq!(parsed["tree_count"], 3);
        let trees = parsed["trees"].as_array().unwrap();
        assert_eq!(trees.len(), 3);
        // Grown trees are objects with either a split or a leaf shape.
        for tree in trees {
            let obj = tree.as_object().unwrap();
            assert!(obj.contains_key("threshold") || obj.contains_key("value"));
        }
    }

    #[test]
    fn ungrown_trees_render_as_null() {
        let forest = Forest::new(2).unwrap();
        let parsed: Value = serde_json::from_str(&forest.as_json()).unwrap();
        assert_eq!(parsed["trees"], serde_json::json!([null, null]));
    }

    #[test]
    fn stats_json_counts_match() {
        let mut forest = trained_forest();
        forest.add("staged", features(&[(0, 99.0)]), 0.0).unwrap();
        forest.remove("s0");

        let parsed: Value = serde_json::from_str(&forest.stats_json()).unwrap();
        assert_eq!(parsed["sample_count"], 20);
        assert_eq!(parsed["pending_adds"], 1);
        assert_eq!(parsed["pending_removals"], 1);
        assert_eq!(parsed["tree_count"], 3);

        let trees = parsed["trees"].as_array().unwrap();
        assert_eq!(trees.len(), 3);
        for tree in trees {
            assert!(tree["node_count"].as_u64().unwrap() >= 1);
            assert!(tree["leaf_count"].as_u64().unwrap() >= 1);
        }
    }

    #[test]
    fn split_nodes_nest_children() {
        let forest = trained_forest();
        let parsed: Value = serde_json::from_str(&forest.as_json()).unwrap();
        let root = &parsed["trees"][0];
        if root.get("threshold").is_some() {
            assert!(root["left"].is_object());
            assert!(root["right"].is_object());
        }
    }
}
