//! # LightGBM binned dataset core
//!
//! The columnar, pre-discretized representation of a training matrix used
//! by LightGBM-style gradient boosting, implemented in pure Rust. The crate
//! owns:
//!
//! - **Exclusive feature bundling**: packing mutually-near-exclusive sparse
//!   features into shared groups to shrink memory and speed up histogram
//!   construction ([`io::bundle`]).
//! - **Parallel histogram construction**: cache-conscious per-group
//!   `(Σg, Σh)` histograms with separate dense and multi-valued paths
//!   ([`Dataset::construct_histograms`]).
//! - The surrounding dataset model (feature-to-group maps, bin boundaries,
//!   monotone/penalty constraints) and a bit-stable binary serialization.
//!
//! Bin-boundary learning, tree learning, loss functions and input parsing
//! live outside this crate; bin mappers arrive already built.
//!
//! ## Example
//!
//! ```rust
//! use lightgbm_dataset::{BinMapper, Dataset, DatasetConfig, MissingType};
//!
//! # fn main() -> lightgbm_dataset::Result<()> {
//! // two three-bin features, mappers already learned elsewhere
//! let mut mappers = (0..2)
//!     .map(|_| {
//!         BinMapper::from_upper_bounds(
//!             vec![0.5, 1.5, f64::INFINITY],
//!             MissingType::None,
//!             0,
//!             0.5,
//!         )
//!         .map(Some)
//!     })
//!     .collect::<lightgbm_dataset::Result<Vec<_>>>()?;
//!
//! let sample_rows: Vec<i32> = (0..4).collect();
//! let sample_vals = vec![1.0, 2.0, 1.0, 2.0];
//! let mut dataset = Dataset::with_num_data(4)?;
//! dataset.construct(
//!     &mut mappers,
//!     Vec::new(),
//!     &[&sample_rows, &sample_rows],
//!     &[&sample_vals, &sample_vals],
//!     &[4, 4],
//!     4,
//!     &DatasetConfig::default(),
//! )?;
//! for row in 0..4 {
//!     dataset.push_one_row(0, row, &[1.0, 2.0])?;
//! }
//! dataset.finish_load();
//! assert!(dataset.num_groups() >= 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod core;
pub mod io;

pub use crate::core::config::{DatasetConfig, DeviceType};
pub use crate::core::error::{DatasetError, Result};
pub use crate::core::meta::{DataSizeT, HistT, LabelT, ScoreT};
pub use crate::core::utils::{Log, LogLevel, Random};
pub use crate::io::bin::{Bin, BinIterator, BinMapper, MissingType};
pub use crate::io::dataset::{Dataset, BINARY_FILE_TOKEN};
pub use crate::io::feature_group::FeatureGroup;
pub use crate::io::metadata::Metadata;
