//! Configuration builder for forest growth.

use crate::error::ForestError;
use crate::split::SplitMethod;

/// Strategy for determining the number of candidate features to consider
/// at each split.
///
/// Feature sets are sparse and vary per node, so the strategy is resolved
/// against the candidate count of the node being split and clamped to
/// `[1, n_candidates]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Square root of the candidate count.
    Sqrt,
    /// Log base 2 of the candidate count.
    Log2,
    /// A fraction of the candidate count (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All candidate features (no subsampling).
    All,
}

/// Resolve `MaxFeatures` to a concrete count, clamped to `[1, n_features]`.
pub(crate) fn resolve_max_features(max_features: MaxFeatures, n_features: usize) -> usize {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    resolved.clamp(1, n_features)
}

/// Growth policy for the ensemble.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods. The
/// config travels inside the binary envelope so a reloaded forest commits
/// exactly like the forest that produced it.
///
/// # Defaults
///
/// | Parameter            | Default     |
/// |----------------------|-------------|
/// | `split_method`       | `Exact`     |
/// | `max_features`       | `Sqrt`      |
/// | `max_depth`          | `None`      |
/// | `min_samples_split`  | 2           |
/// | `min_samples_leaf`   | 1           |
/// | `bootstrap_fraction` | 1.0         |
/// | `seed`               | 42          |
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForestConfig {
    pub(crate) split_method: SplitMethod,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            split_method: SplitMethod::Exact,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap_fraction: 1.0,
            seed: 42,
        }
    }

    // --- Setters ---

    /// Set the split-finding strategy.
    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the bootstrap fraction (proportion of samples drawn per tree).
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the split-finding strategy.
    #[must_use]
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the bootstrap fraction.
    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the config for out-of-range values.
    pub(crate) fn validate(&self) -> Result<(), ForestError> {
        if self.bootstrap_fraction <= 0.0 || self.bootstrap_fraction > 1.0 {
            return Err(ForestError::InvalidBootstrapFraction {
                fraction: self.bootstrap_fraction,
            });
        }
        Ok(())
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{MaxFeatures, resolve_max_features};

    #[test]
    fn sqrt_resolution() {
        assert_eq!(resolve_max_features(MaxFeatures::Sqrt, 16), 4);
        assert_eq!(resolve_max_features(MaxFeatures::Sqrt, 10), 4);
    }

    #[test]
    fn log2_resolution() {
        assert_eq!(resolve_max_features(MaxFeatures::Log2, 8), 3);
        assert_eq!(resolve_max_features(MaxFeatures::Log2, 1), 1);
    }

    #[test]
    fn fixed_clamped_to_candidate_count() {
        assert_eq!(resolve_max_features(MaxFeatures::Fixed(100), 5), 5);
        assert_eq!(resolve_max_features(MaxFeatures::Fixed(0), 5), 1);
    }

    #[test]
    fn fraction_and_all() {
        assert_eq!(resolve_max_features(MaxFeatures::Fraction(0.5), 10), 5);
        assert_eq!(resolve_max_features(MaxFeatures::All, 7), 7);
    }
}
