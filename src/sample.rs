use std::collections::BTreeMap;

use crate::error::ForestError;

/// A labeled training example: unique id, sparse feature map, target value.
///
/// Features are keyed by `u32` index; an absent index is equivalent to the
/// value `0.0` everywhere in the crate (growth and inference agree on this,
/// see [`crate::Tree::infer`]). The map is a `BTreeMap` so iteration and
/// serialization order are deterministic.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    pub(crate) id: String,
    pub(crate) features: BTreeMap<u32, f64>,
    pub(crate) target: f64,
}

impl Sample {
    /// Create a validated sample.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                              |
    /// |------------------------------------|-----------------------------------|
    /// | [`ForestError::EmptySampleId`]     | `id` is empty                     |
    /// | [`ForestError::NonFiniteFeature`]  | any feature value is NaN/infinite |
    /// | [`ForestError::NonFiniteTarget`]   | `target` is NaN/infinite          |
    pub fn new(
        id: impl Into<String>,
        features: BTreeMap<u32, f64>,
        target: f64,
    ) -> Result<Self, ForestError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ForestError::EmptySampleId);
        }
        for (&feature_index, &value) in &features {
            if !value.is_finite() {
                return Err(ForestError::NonFiniteFeature { id, feature_index });
            }
        }
        if !target.is_finite() {
            return Err(ForestError::NonFiniteTarget { id });
        }
        Ok(Self {
            id,
            features,
            target,
        })
    }

    /// Return the sample id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the sparse feature map.
    #[must_use]
    pub fn features(&self) -> &BTreeMap<u32, f64> {
        &self.features
    }

    /// Return the target value.
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Return the value of one feature, `0.0` when absent.
    #[must_use]
    pub fn feature(&self, index: u32) -> f64 {
        self.features.get(&index).copied().unwrap_or(0.0)
    }
}
