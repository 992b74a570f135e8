//! Dataset configuration.
//!
//! Carries the binning and bundling parameters consumed by
//! [`Dataset::construct`](crate::io::dataset::Dataset::construct) and
//! [`Dataset::reset_config`](crate::io::dataset::Dataset::reset_config).
//! The binning-related fields become immutable once a dataset has been
//! constructed; attempts to change them later only produce warnings.

use crate::core::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Computation device. GPU only tightens the per-group bin budget during
/// feature bundling; no device kernels live in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    /// CPU-based computation
    Cpu,
    /// GPU-based computation
    Gpu,
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Cpu
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Cpu => write!(f, "cpu"),
            DeviceType::Gpu => write!(f, "gpu"),
        }
    }
}

/// Configuration for dataset construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Maximum number of bins for feature discretization
    pub max_bin: i32,
    /// Minimum number of data points per bin
    pub min_data_in_bin: i32,
    /// Number of sampled rows used to construct bin boundaries
    pub bin_construct_sample_cnt: i32,
    /// Whether missing values get a dedicated bin
    pub use_missing: bool,
    /// Whether zero values are treated as missing
    pub zero_as_missing: bool,
    /// Whether exclusive feature bundling is enabled
    pub enable_bundle: bool,
    /// Computation device
    pub device_type: DeviceType,
    /// Per-feature monotone constraints (-1, 0, 1); empty means unconstrained
    pub monotone_constraints: Vec<i8>,
    /// Per-feature split-gain multipliers; empty means all 1.0
    pub feature_contri: Vec<f64>,
    /// Per-feature bin-count caps; empty means use `max_bin` everywhere
    pub max_bin_by_feature: Vec<i32>,
    /// Path of the forced-bin-bounds file the dataset was built with
    pub forced_bins_filename: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            max_bin: 255,
            min_data_in_bin: 3,
            bin_construct_sample_cnt: 200_000,
            use_missing: true,
            zero_as_missing: false,
            enable_bundle: true,
            device_type: DeviceType::Cpu,
            monotone_constraints: Vec::new(),
            feature_contri: Vec::new(),
            max_bin_by_feature: Vec::new(),
            forced_bins_filename: String::new(),
        }
    }
}

impl DatasetConfig {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_bin <= 1 {
            return Err(DatasetError::invalid_parameter(
                "max_bin",
                self.max_bin.to_string(),
                "must be greater than 1",
            ));
        }
        if self.min_data_in_bin <= 0 {
            return Err(DatasetError::invalid_parameter(
                "min_data_in_bin",
                self.min_data_in_bin.to_string(),
                "must be positive",
            ));
        }
        if self.bin_construct_sample_cnt <= 0 {
            return Err(DatasetError::invalid_parameter(
                "bin_construct_sample_cnt",
                self.bin_construct_sample_cnt.to_string(),
                "must be positive",
            ));
        }
        for &m in &self.monotone_constraints {
            if !(-1..=1).contains(&m) {
                return Err(DatasetError::invalid_parameter(
                    "monotone_constraints",
                    m.to_string(),
                    "entries must be -1, 0 or 1",
                ));
            }
        }
        Ok(())
    }
}
