//! Binned storage layer: bin mappers, group storage backends, feature
//! groups, per-row metadata, exclusive feature bundling, and the dataset
//! itself.

pub mod bin;
pub mod bundle;
pub mod dataset;
pub mod dense_bin;
pub mod feature_group;
pub mod metadata;
pub mod multi_val_dense_bin;
pub mod sparse_bin;

pub use bin::{Bin, BinIterator, BinMapper, MissingType};
pub use dataset::Dataset;
pub use feature_group::FeatureGroup;
pub use metadata::Metadata;
