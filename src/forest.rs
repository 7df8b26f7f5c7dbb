//! The ensemble: commit orchestration and the operational surface.

use std::collections::BTreeMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::ForestConfig;
use crate::error::ForestError;
use crate::sample::Sample;
use crate::store::SampleStore;
use crate::tree::{Tree, TreeConfig};
use crate::walker::SampleWalker;

/// An incrementally updatable random-forest regressor over sparse,
/// integer-indexed features.
///
/// The ensemble holds a fixed number of trees plus the current training
/// set. Samples are staged with [`add`](Forest::add) /
/// [`remove`](Forest::remove) and take effect only when
/// [`commit`](Forest::commit) regrows the trees; every reader (
/// [`classify`](Forest::classify), iteration, the JSON renderers, the
/// binary codec) observes the committed state alone.
///
/// A `Forest` is a plain owned value: dropping it releases all trees and
/// samples, and there is no process-wide registry of instances.
#[derive(Debug, Clone)]
pub struct Forest {
    pub(crate) config: ForestConfig,
    pub(crate) tree_count: usize,
    pub(crate) trees: Vec<Tree>,
    pub(crate) store: SampleStore,
}

/// Generate a bootstrap draw: `draw_count` indices into `0..n_samples`,
/// with replacement.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

impl Forest {
    /// Create an empty forest with the given number of trees and the
    /// default [`ForestConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `tree_count` is zero.
    pub fn new(tree_count: usize) -> Result<Self, ForestError> {
        Self::with_config(tree_count, ForestConfig::new())
    }

    /// Create an empty forest with an explicit growth config.
    ///
    /// # Errors
    ///
    /// | Variant                                     | When                                |
    /// |---------------------------------------------|-------------------------------------|
    /// | [`ForestError::InvalidTreeCount`]           | `tree_count` is zero                |
    /// | [`ForestError::InvalidBootstrapFraction`]   | fraction outside (0.0, 1.0]         |
    pub fn with_config(tree_count: usize, config: ForestConfig) -> Result<Self, ForestError> {
        if tree_count == 0 {
            return Err(ForestError::InvalidTreeCount { tree_count });
        }
        config.validate()?;
        Ok(Self {
            config,
            tree_count,
            trees: vec![Tree::empty(); tree_count],
            store: SampleStore::new(),
        })
    }

    /// Reassemble a forest from decoded parts (codec path).
    pub(crate) fn from_parts(
        config: ForestConfig,
        tree_count: usize,
        trees: Vec<Tree>,
        committed: BTreeMap<String, Sample>,
    ) -> Self {
        Self {
            config,
            tree_count,
            trees,
            store: SampleStore::from_committed(committed),
        }
    }

    /// Stage a labeled sample for addition at the next commit.
    ///
    /// Returns `Ok(false)` without staging anything when the id is already
    /// present (committed or pending); remove it first to replace it.
    /// Retrying a rejected `add` is safe and reports `false` again.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                              |
    /// |------------------------------------|-----------------------------------|
    /// | [`ForestError::EmptySampleId`]     | `id` is empty                     |
    /// | [`ForestError::NonFiniteFeature`]  | any feature value is NaN/infinite |
    /// | [`ForestError::NonFiniteTarget`]   | `target` is NaN/infinite          |
    pub fn add(
        &mut self,
        id: impl Into<String>,
        features: BTreeMap<u32, f64>,
        target: f64,
    ) -> Result<bool, ForestError> {
        let sample = Sample::new(id, features, target)?;
        Ok(self.store.add(sample))
    }

    /// Stage removal of a sample at the next commit.
    ///
    /// Removing a not-yet-committed sample cancels its pending add.
    /// Returns `false` when the id is unknown; retrying is safe.
    pub fn remove(&mut self, id: &str) -> bool {
        self.store.remove(id)
    }

    /// Apply all pending mutations and regrow every tree from the new
    /// committed set.
    ///
    /// A no-op when nothing is pending. Trees are regrown in parallel,
    /// each from its own bootstrap draw, with per-tree seeds drawn in
    /// ordinal order from a master RNG seeded by the config seed: the
    /// same committed set and config always reproduce the same ensemble,
    /// no matter how many commits led there. The new trees replace the
    /// old only after all of them are grown.
    #[instrument(skip(self), fields(
        tree_count = self.tree_count,
        staged_adds = self.store.staged_add_count(),
        staged_removals = self.store.staged_removal_count(),
    ))]
    pub fn commit(&mut self) {
        if !self.store.is_dirty() {
            debug!("nothing pending, commit skipped");
            return;
        }

        self.store.commit_pending();
        let samples: Vec<&Sample> = self.store.committed_samples().collect();
        let n_samples = samples.len();

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let tree_seeds: Vec<u64> = (0..self.tree_count).map(|_| master_rng.r#gen()).collect();

        let draw_count = ((n_samples as f64) * self.config.bootstrap_fraction).ceil() as usize;

        // Capture config fields needed in the closure.
        let split_method = self.config.split_method;
        let max_features = self.config.max_features;
        let max_depth = self.config.max_depth;
        let min_samples_split = self.config.min_samples_split;
        let min_samples_leaf = self.config.min_samples_leaf;

        let trees: Vec<Tree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                if n_samples == 0 {
                    return Tree::empty();
                }
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap_indices = bootstrap_sample(n_samples, draw_count, &mut rng);
                let view: Vec<&Sample> = bootstrap_indices.iter().map(|&i| samples[i]).collect();

                let tree_config = TreeConfig {
                    split_method,
                    max_features,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                    seed: rng.r#gen(),
                };
                tree_config.grow(&view)
            })
            .collect();

        self.trees = trees;

        info!(
            n_samples,
            tree_count = self.tree_count,
            "committed and regrew ensemble"
        );
    }

    /// Classify a sparse feature map: the arithmetic mean of per-tree
    /// inference over all trees, in stored order.
    ///
    /// Returns `f64::NAN` while the committed sample set is empty (the
    /// ensemble has nothing to say yet). An empty feature map is a valid
    /// input; every absent feature reads as `0.0`.
    #[must_use]
    pub fn classify(&self, features: &BTreeMap<u32, f64>) -> f64 {
        self.classify_partial(features, self.tree_count)
    }

    /// Classify using only the first `min(n, tree_count)` trees in stored
    /// order.
    ///
    /// The prefix is stable: growing `n` only adds trees to the average,
    /// and `classify_partial(x, tree_count)` equals
    /// [`classify`](Forest::classify)`(x)` exactly. Returns `f64::NAN`
    /// when `n` is zero or the committed sample set is empty.
    #[must_use]
    pub fn classify_partial(&self, features: &BTreeMap<u32, f64>, n: usize) -> f64 {
        let k = n.min(self.tree_count);
        if k == 0 || self.store.committed_len() == 0 {
            return f64::NAN;
        }
        let total: f64 = self.trees[..k].iter().map(|t| t.infer(features)).sum();
        total / k as f64
    }

    /// Visit every committed sample in id order.
    ///
    /// `visit` receives `(id, features, target)` and returns `true` to
    /// continue, `false` to stop early. Mutating the forest from inside
    /// the callback is rejected at compile time: `each` holds a shared
    /// borrow for the whole traversal.
    pub fn each<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &BTreeMap<u32, f64>, f64) -> bool,
    {
        let mut walker = self.samples();
        while walker.still_some() {
            let Some(sample) = walker.get() else {
                break;
            };
            if !visit(sample.id(), sample.features(), sample.target()) {
                break;
            }
        }
    }

    /// Return a forward-only cursor over the committed sample set.
    #[must_use]
    pub fn samples(&self) -> SampleWalker<'_> {
        SampleWalker::new(self.store.committed_samples())
    }

    /// Return the number of committed samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.store.committed_len()
    }

    /// Return the number of staged, not-yet-committed mutations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.store.staged_add_count() + self.store.staged_removal_count()
    }

    /// Return the fixed number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.tree_count
    }

    /// Return the trees in stored order.
    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Return the growth config.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::Forest;
    use crate::config::ForestConfig;
    use crate::error::ForestError;
    use crate::split::SplitMethod;

    fn features(pairs: &[(u32, f64)]) -> BTreeMap<u32, f64> {
        pairs.iter().copied().collect()
    }

    /// Forest with a committed linear-ish dataset on features 0 and 1.
    fn trained_forest(tree_count: usize) -> Forest {
        let mut forest = Forest::new(tree_count).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for i in 0..60 {
            let x = i as f64 * 0.5;
            let noise: f64 = rng.r#gen::<f64>() * 0.1;
            forest
                .add(
                    format!("s{i}"),
                    features(&[(0, x), (1, (i % 5) as f64)]),
                    x + noise,
                )
                .unwrap();
        }
        forest.commit();
        forest
    }

    #[test]
    fn zero_tree_count_rejected() {
        let err = Forest::new(0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTreeCount { tree_count: 0 }));
    }

    #[test]
    fn invalid_bootstrap_fraction_rejected() {
        let config = ForestConfig::new().with_bootstrap_fraction(0.0);
        let err = Forest::with_config(3, config).unwrap_err();
        assert!(matches!(err, ForestError::InvalidBootstrapFraction { .. }));
    }

    #[test]
    fn classify_before_any_commit_is_nan() {
        let forest = Forest::new(3).unwrap();
        assert!(forest.classify(&features(&[(0, 1.0)])).is_nan());
    }

    #[test]
    fn add_is_invisible_until_commit() {
        let mut forest = trained_forest(5);
        let probe = features(&[(0, 10.0), (1, 2.0)]);
        let before = forest.classify(&probe);

        // A wildly different sample, staged but not committed.
        forest.add("outlier", features(&[(0, 10.0)]), 1000.0).unwrap();
        assert_eq!(forest.classify(&probe), before);
        assert_eq!(forest.sample_count(), 60);

        forest.commit();
        assert_ne!(forest.classify(&probe), before);
    }

    #[test]
    fn add_remove_commit_leaves_state_unchanged() {
        let mut forest = trained_forest(5);
        let probe = features(&[(0, 14.0), (1, 1.0)]);
        let before = forest.classify(&probe);

        forest.add("tmp", features(&[(0, 3.0)]), 99.0).unwrap();
        assert!(forest.remove("tmp"));
        forest.commit();

        assert_eq!(forest.classify(&probe), before);
        assert_eq!(forest.sample_count(), 60);
    }

    #[test]
    fn duplicate_add_rejected_and_original_preserved() {
        let mut forest = Forest::new(2).unwrap();
        assert!(forest.add("s1", features(&[(0, 1.0)]), 5.0).unwrap());
        assert!(!forest.add("s1", features(&[]), 0.0).unwrap());
        forest.commit();

        let mut walker = forest.samples();
        let sample = walker.get().unwrap();
        assert_eq!(sample.target(), 5.0);
        assert_eq!(sample.feature(0), 1.0);
    }

    #[test]
    fn remove_unknown_id_returns_false() {
        let mut forest = trained_forest(3);
        assert!(!forest.remove("nonexistent"));
        assert_eq!(forest.pending_count(), 0);
    }

    #[test]
    fn empty_id_add_rejected() {
        let mut forest = Forest::new(1).unwrap();
        let err = forest.add("", features(&[(0, 1.0)]), 1.0).unwrap_err();
        assert!(matches!(err, ForestError::EmptySampleId));
    }

    #[test]
    fn non_finite_feature_rejected() {
        let mut forest = Forest::new(1).unwrap();
        let err = forest
            .add("s1", features(&[(4, f64::NAN)]), 1.0)
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::NonFiniteFeature {
                feature_index: 4,
                ..
            }
        ));
    }

    #[test]
    fn classify_partial_full_prefix_equals_classify() {
        let forest = trained_forest(8);
        let probe = features(&[(0, 12.0), (1, 3.0)]);
        assert_eq!(forest.classify_partial(&probe, 8), forest.classify(&probe));
        // n beyond tree_count clamps.
        assert_eq!(forest.classify_partial(&probe, 99), forest.classify(&probe));
    }

    #[test]
    fn classify_partial_zero_is_nan() {
        let forest = trained_forest(4);
        assert!(forest
            .classify_partial(&features(&[(0, 1.0)]), 0)
            .is_nan());
    }

    #[test]
    fn classify_partial_prefix_is_stable() {
        let forest = trained_forest(6);
        let probe = features(&[(0, 20.0), (1, 2.0)]);
        // Mean over a prefix of k trees times k gives the prefix sum;
        // sums must be consistent between n1 < n2.
        let sum3 = forest.classify_partial(&probe, 3) * 3.0;
        let sum6 = forest.classify_partial(&probe, 6) * 6.0;
        let tail: f64 = forest.trees()[3..6].iter().map(|t| t.infer(&probe)).sum();
        assert!((sum6 - (sum3 + tail)).abs() < 1e-9);
    }

    #[test]
    fn classify_with_empty_feature_map_is_finite() {
        let forest = trained_forest(5);
        let prediction = forest.classify(&BTreeMap::new());
        assert!(prediction.is_finite());
    }

    #[test]
    fn removing_all_samples_returns_ensemble_to_nan() {
        let mut forest = Forest::new(2).unwrap();
        forest.add("a", features(&[(0, 1.0)]), 1.0).unwrap();
        forest.commit();
        assert!(forest.classify(&features(&[(0, 1.0)])).is_finite());

        assert!(forest.remove("a"));
        forest.commit();
        assert!(forest.classify(&features(&[(0, 1.0)])).is_nan());
    }

    #[test]
    fn deterministic_across_identically_seeded_forests() {
        let f1 = trained_forest(10);
        let f2 = trained_forest(10);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..20 {
            let probe = features(&[(0, rng.r#gen::<f64>() * 30.0), (1, 2.0)]);
            assert_eq!(f1.classify(&probe), f2.classify(&probe));
        }
    }

    #[test]
    fn commit_order_does_not_change_committed_state() {
        // Same final sample set reached through different mutation
        // histories must classify identically.
        let mut f1 = Forest::new(4).unwrap();
        f1.add("a", features(&[(0, 1.0)]), 1.0).unwrap();
        f1.add("b", features(&[(0, 2.0)]), 2.0).unwrap();
        f1.add("c", features(&[(0, 3.0)]), 3.0).unwrap();
        f1.commit();

        let mut f2 = Forest::new(4).unwrap();
        f2.add("c", features(&[(0, 3.0)]), 3.0).unwrap();
        f2.add("dropped", features(&[(0, 9.0)]), 9.0).unwrap();
        f2.commit();
        f2.add("b", features(&[(0, 2.0)]), 2.0).unwrap();
        f2.add("a", features(&[(0, 1.0)]), 1.0).unwrap();
        f2.remove("dropped");
        f2.commit();

        let probe = features(&[(0, 2.5)]);
        assert_eq!(f1.classify(&probe), f2.classify(&probe));
    }

    #[test]
    fn each_visits_in_id_order_and_stops_early() {
        let mut forest = Forest::new(1).unwrap();
        for id in ["c", "a", "d", "b"] {
            forest.add(id, features(&[(0, 1.0)]), 1.0).unwrap();
        }
        forest.commit();

        let mut seen = Vec::new();
        forest.each(|id, _, _| {
            seen.push(id.to_string());
            seen.len() < 3
        });
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn extra_trees_config_commits_and_classifies() {
        let config = ForestConfig::new()
            .with_split_method(SplitMethod::ExtraTrees)
            .with_seed(11);
        let mut forest = Forest::with_config(6, config).unwrap();
        for i in 0..40 {
            forest
                .add(format!("s{i}"), features(&[(0, i as f64)]), (i / 10) as f64)
                .unwrap();
        }
        forest.commit();
        let p = forest.classify(&features(&[(0, 35.0)]));
        assert!(p.is_finite());
        assert!(p > 1.0);
    }
}
