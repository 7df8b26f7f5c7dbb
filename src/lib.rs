//! Incrementally updatable random-forest regression over sparse features.
//!
//! Provides an in-memory ensemble of CART regression trees that supports
//! online addition and removal of labeled samples, explicit commit of
//! pending mutations (parallel tree regrowth via rayon), full and
//! partial-ensemble inference, iteration over the committed training set,
//! and lossless binary serialization plus JSON introspection.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use taiga::Forest;
//!
//! let mut forest = Forest::new(10)?;
//! forest.add("s1", BTreeMap::from([(0, 1.0), (3, 0.5)]), 2.0)?;
//! forest.add("s2", BTreeMap::from([(0, 4.0)]), 8.0)?;
//! forest.commit();
//!
//! let prediction = forest.classify(&BTreeMap::from([(0, 2.0)]));
//! assert!(prediction.is_finite());
//!
//! let bytes = forest.to_bytes()?;
//! let restored = Forest::from_bytes(&bytes)?;
//! assert_eq!(restored.classify(&BTreeMap::from([(0, 2.0)])), prediction);
//! # Ok::<(), taiga::ForestError>(())
//! ```

mod codec;
mod config;
mod error;
mod forest;
mod node;
mod sample;
mod split;
mod stats;
mod store;
mod tree;
mod walker;

pub use config::{ForestConfig, MaxFeatures};
pub use error::ForestError;
pub use forest::Forest;
pub use node::{FeatureIndex, Node, NodeIndex};
pub use sample::Sample;
pub use split::SplitMethod;
pub use tree::Tree;
pub use walker::SampleWalker;
