//! Bin mapping and binned storage contracts.
//!
//! A [`BinMapper`] is a pure value-to-bin oracle: it owns the learned bin
//! boundaries of one feature and answers bin-count/default-bin/most-frequent
//! queries. Boundary learning happens outside this crate; mappers arrive
//! already built (via [`BinMapper::from_upper_bounds`] or deserialization).
//!
//! A [`Bin`] is the columnar storage of one feature group's bin indices.
//! Values are stored in the group-global encoding: slot `0` is reserved for
//! the implicit most-frequent bin, and sub-feature `j`'s bin `b` lives at
//! `bin_offsets[j] + b - (most_freq_bin == 0 ? 1 : 0)`.

use crate::core::error::{DatasetError, Result};
use crate::core::meta::*;
use crate::core::utils::{BinaryReader, BinaryWriter};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Sparse threshold for determining bin storage strategy
pub const K_SPARSE_THRESHOLD: f64 = 0.8;

/// Missing value handling type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingType {
    /// No missing values
    None,
    /// Zero is treated as missing
    Zero,
    /// NaN is treated as missing
    NaN,
}

impl Default for MissingType {
    fn default() -> Self {
        MissingType::None
    }
}

impl MissingType {
    fn to_i8(self) -> i8 {
        match self {
            MissingType::None => 0,
            MissingType::Zero => 1,
            MissingType::NaN => 2,
        }
    }

    fn from_i8(v: i8) -> Result<Self> {
        match v {
            0 => Ok(MissingType::None),
            1 => Ok(MissingType::Zero),
            2 => Ok(MissingType::NaN),
            _ => Err(DatasetError::serialization(format!(
                "unknown missing type tag {}",
                v
            ))),
        }
    }
}

/// Binary mapper for feature discretization.
///
/// Immutable once attached to a feature group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinMapper {
    /// Number of bins for this feature
    num_bin_: i32,
    /// Missing value handling type
    missing_type_: MissingType,
    /// Whether this feature is trivial (single value)
    is_trivial_: bool,
    /// Sparsity rate of the most frequent bin
    sparse_rate_: f64,
    /// Upper bounds for numerical bins
    bin_upper_bound_: Vec<f64>,
    /// Default bin index (the bin zero maps to)
    default_bin_: u32,
    /// Most frequent bin index
    most_freq_bin_: u32,
}

impl BinMapper {
    /// Create a trivial mapper with a single catch-all bin.
    pub fn new() -> Self {
        BinMapper {
            num_bin_: 1,
            missing_type_: MissingType::None,
            is_trivial_: true,
            sparse_rate_: 1.0,
            bin_upper_bound_: vec![f64::INFINITY],
            default_bin_: 0,
            most_freq_bin_: 0,
        }
    }

    /// Build a mapper from already-learned bin upper bounds.
    ///
    /// The last bound must be `+inf` (or NaN when `missing_type` is NaN and
    /// the last bin is the missing bin). `default_bin` is derived from where
    /// zero falls; `most_freq_bin` and `sparse_rate` come from the caller's
    /// sample statistics.
    pub fn from_upper_bounds(
        bin_upper_bound: Vec<f64>,
        missing_type: MissingType,
        most_freq_bin: u32,
        sparse_rate: f64,
    ) -> Result<Self> {
        if bin_upper_bound.is_empty() {
            return Err(DatasetError::invalid_parameter(
                "bin_upper_bound",
                "[]",
                "at least one bound is required",
            ));
        }
        let num_bin = bin_upper_bound.len() as i32;
        if most_freq_bin as i32 >= num_bin {
            return Err(DatasetError::invalid_parameter(
                "most_freq_bin",
                most_freq_bin.to_string(),
                "must be smaller than the bin count",
            ));
        }
        let mut mapper = BinMapper {
            num_bin_: num_bin,
            missing_type_: missing_type,
            is_trivial_: num_bin <= 1,
            sparse_rate_: sparse_rate,
            bin_upper_bound_: bin_upper_bound,
            default_bin_: 0,
            most_freq_bin_: most_freq_bin,
        };
        mapper.default_bin_ = mapper.value_to_bin(0.0);
        Ok(mapper)
    }

    /// Convert a feature value to its corresponding bin index.
    pub fn value_to_bin(&self, value: f64) -> u32 {
        if value.is_nan() {
            if self.missing_type_ == MissingType::NaN {
                return (self.num_bin_ - 1) as u32;
            }
            return self.default_bin_;
        }
        // first bound with value <= bound; the last bound is a catch-all
        let mut lo = 0usize;
        let mut hi = self.bin_upper_bound_.len() - 1;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if value <= self.bin_upper_bound_[mid] {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo as u32
    }

    /// Get the number of bins
    pub fn num_bin(&self) -> i32 {
        self.num_bin_
    }

    /// Check if this feature is trivial
    pub fn is_trivial(&self) -> bool {
        self.is_trivial_
    }

    /// Get the sparse rate
    pub fn sparse_rate(&self) -> f64 {
        self.sparse_rate_
    }

    /// Get the missing type
    pub fn missing_type(&self) -> MissingType {
        self.missing_type_
    }

    /// Get the default bin
    pub fn default_bin(&self) -> u32 {
        self.default_bin_
    }

    /// Get the most frequent bin
    pub fn most_freq_bin(&self) -> u32 {
        self.most_freq_bin_
    }

    /// Size of the serialized mapper in bytes.
    pub fn sizes_in_byte(&self) -> usize {
        // num_bin + missing_type + is_trivial + sparse_rate
        // + default_bin + most_freq_bin + bounds
        4 + 1 + 1 + 8 + 4 + 4 + 8 * self.bin_upper_bound_.len()
    }

    /// Serialize the mapper.
    pub fn save_binary<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_i32(self.num_bin_)?;
        writer.write_i8(self.missing_type_.to_i8())?;
        writer.write_bool(self.is_trivial_)?;
        writer.write_f64(self.sparse_rate_)?;
        writer.write_i32(self.default_bin_ as i32)?;
        writer.write_i32(self.most_freq_bin_ as i32)?;
        writer.write_f64_slice(&self.bin_upper_bound_)?;
        Ok(())
    }

    /// Deserialize a mapper written by [`BinMapper::save_binary`].
    pub fn load_binary(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let num_bin = reader.read_i32()?;
        if num_bin < 1 {
            return Err(DatasetError::serialization(format!(
                "invalid bin count {}",
                num_bin
            )));
        }
        let missing_type = MissingType::from_i8(reader.read_i8()?)?;
        let is_trivial = reader.read_bool()?;
        let sparse_rate = reader.read_f64()?;
        let default_bin = reader.read_i32()? as u32;
        let most_freq_bin = reader.read_i32()? as u32;
        let bin_upper_bound = reader.read_f64_vec(num_bin as usize)?;
        Ok(BinMapper {
            num_bin_: num_bin,
            missing_type_: missing_type,
            is_trivial_: is_trivial,
            sparse_rate_: sparse_rate,
            bin_upper_bound_: bin_upper_bound,
            default_bin_: default_bin,
            most_freq_bin_: most_freq_bin,
        })
    }
}

impl Default for BinMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over one sub-feature's raw bin values inside a group storage.
pub trait BinIterator {
    /// Reset iteration to start from `start_idx`.
    fn reset(&mut self, start_idx: DataSizeT);
    /// Raw feature bin of `idx` (most-frequent bin for unset rows).
    fn get(&mut self, idx: DataSizeT) -> u32;
}

/// Columnar binned storage for one feature group.
///
/// Stored values use the group-global encoding described in the module docs;
/// value `0` means every sub-feature sits at its most-frequent bin for that
/// row. Histogram output buffers are interleaved `(grad, hess)` pairs of
/// length `2 * num_total_bin`.
pub trait Bin: Send + Sync + std::fmt::Debug {
    /// Store `value` for row `idx`. `tid` is the pushing thread's id.
    fn push(&mut self, tid: usize, idx: DataSizeT, value: u32);

    /// Called once after all values have been pushed.
    fn finish_load(&mut self);

    /// Change the row capacity.
    fn resize(&mut self, num_data: DataSizeT);

    /// Number of rows.
    fn num_data(&self) -> DataSizeT;

    /// Iterator translating stored values back to one sub-feature's raw bins.
    fn iterator(&self, min_bin: u32, max_bin: u32, most_freq_bin: u32) -> Box<dyn BinIterator + '_>;

    /// Accumulate `(Σg, Σh)` per stored bin over rows `[start, end)`.
    fn construct_histogram(
        &self,
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        ordered_hessians: &[ScoreT],
        out: &mut [HistT],
    );

    /// Row-subset variant: row `i` is `data_indices[i]`, statistics are the
    /// already-gathered `ordered_*[i]`.
    fn construct_histogram_indexed(
        &self,
        data_indices: &[DataSizeT],
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        ordered_hessians: &[ScoreT],
        out: &mut [HistT],
    );

    /// Hessian-free variant: sums `1.0` into each hessian slot.
    fn construct_histogram_no_hessian(
        &self,
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        out: &mut [HistT],
    );

    /// Row-subset, hessian-free variant.
    fn construct_histogram_indexed_no_hessian(
        &self,
        data_indices: &[DataSizeT],
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        out: &mut [HistT],
    );

    /// Bulk-select rows from `full_bin` (same concrete storage type).
    fn copy_subset(&mut self, full_bin: &dyn Bin, used_indices: &[DataSizeT]);

    /// Serialized payload size in bytes.
    fn sizes_in_byte(&self) -> usize;

    /// Write the payload.
    fn save_binary(&self, writer: &mut dyn Write) -> Result<()>;

    /// Restore the payload written by [`Bin::save_binary`].
    fn load_binary(&mut self, reader: &mut BinaryReader<'_>) -> Result<()>;

    /// Deep clone.
    fn clone_bin(&self) -> Box<dyn Bin>;

    /// Downcast support for `copy_subset`.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Create dense group storage, choosing the value width from the bin count.
pub fn create_dense_bin(num_data: DataSizeT, num_total_bin: i32) -> Box<dyn Bin> {
    use crate::io::dense_bin::DenseBin;
    if num_total_bin <= 256 {
        Box::new(DenseBin::<u8>::new(num_data))
    } else if num_total_bin <= 65536 {
        Box::new(DenseBin::<u16>::new(num_data))
    } else {
        Box::new(DenseBin::<u32>::new(num_data))
    }
}

/// Create sparse group storage, choosing the value width from the bin count.
pub fn create_sparse_bin(num_data: DataSizeT, num_total_bin: i32) -> Box<dyn Bin> {
    use crate::io::sparse_bin::SparseBin;
    if num_total_bin <= 256 {
        Box::new(SparseBin::<u8>::new(num_data))
    } else if num_total_bin <= 65536 {
        Box::new(SparseBin::<u16>::new(num_data))
    } else {
        Box::new(SparseBin::<u32>::new(num_data))
    }
}

/// Create multi-valued group storage with per-sub-feature offsets.
pub fn create_multi_val_dense_bin(
    num_data: DataSizeT,
    num_total_bin: i32,
    offsets: Vec<u32>,
) -> Box<dyn Bin> {
    use crate::io::multi_val_dense_bin::MultiValDenseBin;
    if num_total_bin <= 256 {
        Box::new(MultiValDenseBin::<u8>::new(num_data, offsets))
    } else if num_total_bin <= 65536 {
        Box::new(MultiValDenseBin::<u16>::new(num_data, offsets))
    } else {
        Box::new(MultiValDenseBin::<u32>::new(num_data, offsets))
    }
}

/// Storage kind tag used inside feature-group payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinStorageKind {
    /// One dense value per row
    Dense,
    /// (row, value) pairs
    Sparse,
    /// Row-major multi-value layout
    MultiValDense,
}

impl BinStorageKind {
    /// Tag byte for serialization.
    pub fn to_i8(self) -> i8 {
        match self {
            BinStorageKind::Dense => 0,
            BinStorageKind::Sparse => 1,
            BinStorageKind::MultiValDense => 2,
        }
    }

    /// Decode a tag byte.
    pub fn from_i8(v: i8) -> Result<Self> {
        match v {
            0 => Ok(BinStorageKind::Dense),
            1 => Ok(BinStorageKind::Sparse),
            2 => Ok(BinStorageKind::MultiValDense),
            _ => Err(DatasetError::serialization(format!(
                "unknown bin storage tag {}",
                v
            ))),
        }
    }
}
