use std::collections::BTreeSet;

use rand::Rng;

use crate::config::{MaxFeatures, resolve_max_features};
use crate::node::FeatureIndex;
use crate::sample::Sample;

/// Strategy for finding the threshold of a split.
///
/// Both strategies score candidates by weighted variance reduction and are
/// deterministic given the same samples and RNG state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitMethod {
    /// Evaluate every midpoint between distinct adjacent values.
    Exact,
    /// Draw one uniform random threshold per candidate feature
    /// (Extremely Randomized Trees).
    ExtraTrees,
}

/// Sum of squared errors around the mean: `Σy² - (Σy)²/n`.
///
/// Returns `0.0` for an empty set. Floating-point cancellation can push
/// the single-pass formula slightly negative; results clamp to zero.
pub(crate) fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value: samples with feature value < threshold go left.
    pub(crate) threshold: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best variance-reducing split among a random subset of the
/// candidate features.
///
/// Candidate features are the union of indices present in the node's
/// samples (an absent feature reads as `0.0` when scanned). For each of up
/// to `max_features` randomly chosen candidates the method either scans
/// sorted `(value, target)` pairs with incremental sum / sum-of-squares
/// updates (`Exact`) or draws one uniform threshold in the observed value
/// range (`ExtraTrees`), and tracks the globally best split by SSE
/// decrease.
///
/// Returns `None` when no valid split exists (no candidate features, all
/// values identical, or every boundary violates `min_samples_leaf`).
pub(crate) fn find_best_split(
    samples: &[&Sample],
    indices: &[usize],
    method: SplitMethod,
    max_features: MaxFeatures,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_samples = indices.len();
    if n_samples < 2 {
        return None;
    }

    // Candidate features: every index observed in this node's samples,
    // in sorted order so the partial shuffle below is deterministic.
    let candidates: Vec<u32> = indices
        .iter()
        .flat_map(|&i| samples[i].features().keys().copied())
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let mut total_sum = 0.0;
    let mut total_sum_sq = 0.0;
    for &i in indices {
        let y = samples[i].target();
        total_sum += y;
        total_sum_sq += y * y;
    }
    let parent_sse = sse(total_sum, total_sum_sq, n_samples);

    // Partial Fisher-Yates: shuffle only the first `take` positions.
    let mut feature_order = candidates;
    let n_candidates = feature_order.len();
    let take = resolve_max_features(max_features, n_candidates);
    for i in 0..take {
        let j = rng.gen_range(i..n_candidates);
        feature_order.swap(i, j);
    }
    let selected_features = &feature_order[..take];

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in selected_features {
        match method {
            SplitMethod::Exact => {
                let mut sorted: Vec<(f64, usize)> = indices
                    .iter()
                    .map(|&i| (samples[i].feature(feat_idx), i))
                    .collect();
                sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

                // Incremental scan: left grows from empty, right shrinks from full.
                let mut left_sum = 0.0;
                let mut left_sum_sq = 0.0;

                for i in 0..(n_samples - 1) {
                    let (val_i, si) = sorted[i];
                    let y = samples[si].target();
                    left_sum += y;
                    left_sum_sq += y * y;

                    // No valid boundary between identical values.
                    let val_next = sorted[i + 1].0;
                    if val_i == val_next {
                        continue;
                    }

                    let n_left = i + 1;
                    let n_right = n_samples - n_left;
                    if n_left < min_samples_leaf || n_right < min_samples_leaf {
                        continue;
                    }

                    let left_sse = sse(left_sum, left_sum_sq, n_left);
                    let right_sse =
                        sse(total_sum - left_sum, total_sum_sq - left_sum_sq, n_right);
                    let decrease = parent_sse - left_sse - right_sse;

                    if decrease > best_decrease {
                        best_decrease = decrease;
                        let threshold = (val_i + val_next) / 2.0;
                        best = Some((FeatureIndex::new(feat_idx), threshold));
                    }
                }
            }
            SplitMethod::ExtraTrees => {
                let mut lo = f64::INFINITY;
                let mut hi = f64::NEG_INFINITY;
                for &i in indices {
                    let v = samples[i].feature(feat_idx);
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
                if lo == hi {
                    continue;
                }
                let threshold = rng.gen_range(lo..hi);

                let mut n_left = 0;
                let mut left_sum = 0.0;
                let mut left_sum_sq = 0.0;
                for &i in indices {
                    if samples[i].feature(feat_idx) < threshold {
                        let y = samples[i].target();
                        n_left += 1;
                        left_sum += y;
                        left_sum_sq += y * y;
                    }
                }
                let n_right = n_samples - n_left;
                if n_left < min_samples_leaf || n_right < min_samples_leaf {
                    continue;
                }

                let left_sse = sse(left_sum, left_sum_sq, n_left);
                let right_sse = sse(total_sum - left_sum, total_sum_sq - left_sum_sq, n_right);
                let decrease = parent_sse - left_sse - right_sse;

                if decrease > best_decrease {
                    best_decrease = decrease;
                    best = Some((FeatureIndex::new(feat_idx), threshold));
                }
            }
        }
    }

    let (feature, threshold) = best?;

    // Partition indices into left/right by the chosen boundary.
    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &i in indices {
        if samples[i].feature(feature.index()) < threshold {
            left_indices.push(i);
        } else {
            right_indices.push(i);
        }
    }

    Some(SplitResult {
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}
