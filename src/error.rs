use std::path::PathBuf;

/// Errors from forest operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when a forest is created with zero trees.
    #[error("tree_count must be at least 1, got {tree_count}")]
    InvalidTreeCount {
        /// The invalid tree_count value provided.
        tree_count: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when a sample is added with an empty id.
    #[error("sample id must not be empty")]
    EmptySampleId,

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value for feature {feature_index} of sample {id:?}")]
    NonFiniteFeature {
        /// Id of the offending sample.
        id: String,
        /// Index of the offending feature.
        feature_index: u32,
    },

    /// Returned when a target value is NaN or infinite.
    #[error("non-finite target for sample {id:?}")]
    NonFiniteTarget {
        /// Id of the offending sample.
        id: String,
    },

    /// Returned when a decoded tree violates the arena invariants
    /// (child index out of range or not strictly after its parent).
    #[error("malformed tree at index {tree_index}")]
    MalformedTree {
        /// Ordinal of the offending tree within the ensemble.
        tree_index: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a model buffer is malformed or truncated.
    #[error("corrupt model data")]
    CorruptModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a decoded envelope is internally inconsistent
    /// (wrong tree count, empty id, non-finite stored value).
    #[error("corrupt model data: {reason}")]
    InconsistentModel {
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// Returned when loading a model with an unknown format version.
    #[error("incompatible model format version: expected {expected}, found {found}")]
    IncompatibleFormatVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the buffer.
        found: u32,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
