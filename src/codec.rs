//! Binary model encoding and decoding via bincode.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::ForestConfig;
use crate::error::ForestError;
use crate::forest::Forest;
use crate::sample::Sample;
use crate::tree::Tree;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
///
/// Field order is the wire order: version tag, tree count, growth config,
/// tree arenas, then the committed sample set. The committed map is
/// id-sorted, so two forests with the same committed state and config
/// encode to byte-identical buffers.
#[derive(serde::Serialize, serde::Deserialize)]
struct ForestEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Fixed number of trees in the ensemble.
    tree_count: usize,
    /// Growth config, so a reloaded forest commits identically.
    config: ForestConfig,
    /// Arena node lists, one per tree, in stored order.
    trees: Vec<Tree>,
    /// The committed sample set, keyed by id.
    samples: BTreeMap<String, Sample>,
}

impl Forest {
    /// Encode the committed state (trees, samples, config) to a buffer.
    ///
    /// Pending mutations are not part of the committed state and are not
    /// encoded. The encoding is deterministic: equal committed state and
    /// config produce byte-identical output.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::SerializeModel`] when bincode encoding fails.
    #[instrument(skip(self), fields(tree_count = self.tree_count, n_samples = self.sample_count()))]
    pub fn to_bytes(&self) -> Result<Vec<u8>, ForestError> {
        let envelope = ForestEnvelope {
            format_version: FORMAT_VERSION,
            tree_count: self.tree_count,
            config: self.config.clone(),
            trees: self.trees.clone(),
            samples: self.store.committed().clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| ForestError::SerializeModel { source: e })?;

        debug!(size_bytes = bytes.len(), "model encoded");

        Ok(bytes)
    }

    /// Decode a forest from a buffer produced by [`to_bytes`](Forest::to_bytes).
    ///
    /// Checks the format version and validates every decoded invariant
    /// before constructing anything: malformed, truncated, or internally
    /// inconsistent input never yields a partially built forest. The
    /// loaded forest starts with empty pending buffers.
    ///
    /// # Errors
    ///
    /// | Variant                                      | Condition                               |
    /// |----------------------------------------------|-----------------------------------------|
    /// | [`ForestError::CorruptModel`]                | bincode decoding failed / truncated     |
    /// | [`ForestError::IncompatibleFormatVersion`]   | unknown format version                  |
    /// | [`ForestError::InconsistentModel`]           | envelope fields contradict each other   |
    /// | [`ForestError::MalformedTree`]               | a tree arena violates its invariants    |
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ForestError> {
        let envelope: ForestEnvelope =
            bincode::deserialize(bytes).map_err(|e| ForestError::CorruptModel { source: e })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleFormatVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
            });
        }

        validate_envelope(&envelope)?;

        debug!(
            tree_count = envelope.tree_count,
            n_samples = envelope.samples.len(),
            "model decoded"
        );

        Ok(Forest::from_parts(
            envelope.config,
            envelope.tree_count,
            envelope.trees,
            envelope.samples,
        ))
    }

    /// Save the encoded model to a file.
    ///
    /// # Errors
    ///
    /// | Variant                           | Condition                |
    /// |-----------------------------------|--------------------------|
    /// | [`ForestError::SerializeModel`]   | bincode encoding failed  |
    /// | [`ForestError::WriteModel`]       | file write failed        |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        std::fs::write(path, &bytes).map_err(|e| ForestError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            tree_count = self.tree_count,
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a file.
    ///
    /// # Errors
    ///
    /// [`ForestError::ReadModel`] when the file cannot be read, otherwise
    /// everything [`from_bytes`](Forest::from_bytes) returns.
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_bytes(&bytes)
    }
}

/// Reject decoded envelopes that bincode accepted but that violate the
/// model invariants.
fn validate_envelope(envelope: &ForestEnvelope) -> Result<(), ForestError> {
    if envelope.tree_count == 0 {
        return Err(ForestError::InconsistentModel {
            reason: "tree_count is zero".to_string(),
        });
    }
    if envelope.trees.len() != envelope.tree_count {
        return Err(ForestError::InconsistentModel {
            reason: format!(
                "tree_count is {} but {} trees are present",
                envelope.tree_count,
                envelope.trees.len()
            ),
        });
    }
    envelope.config.validate().map_err(|_| ForestError::InconsistentModel {
        reason: "growth config out of range".to_string(),
    })?;

    for (tree_index, tree) in envelope.trees.iter().enumerate() {
        if !tree.is_well_formed() {
            return Err(ForestError::MalformedTree { tree_index });
        }
    }

    for (key, sample) in &envelope.samples {
        if sample.id().is_empty() || sample.id() != key {
            return Err(ForestError::InconsistentModel {
                reason: format!("sample key {key:?} does not match its id"),
            });
        }
        if !sample.target().is_finite()
            || sample.features().values().any(|v| !v.is_finite())
        {
            return Err(ForestError::InconsistentModel {
                reason: format!("non-finite value in sample {key:?}"),
            });
        }
    }

    Ok(())
}
