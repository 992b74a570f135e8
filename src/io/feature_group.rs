//! FeatureGroup: binned storage and mappers for one bundle of features.
//!
//! A group owns the bin mappers of its bundled features (in bundling order)
//! and a single [`Bin`] storage. Bin accounting reserves slot 0 as the
//! implicit most-frequent bin, and drops each sub-feature's own bin 0 from
//! the layout when its most-frequent bin is 0, so
//! `num_total_bin = 1 + Σ (num_bin_j - [most_freq_bin_j == 0])`.

use crate::core::error::{DatasetError, Result};
use crate::core::meta::*;
use crate::core::utils::{BinaryReader, BinaryWriter};
use crate::io::bin::{
    create_dense_bin, create_multi_val_dense_bin, create_sparse_bin, Bin, BinIterator, BinMapper,
    BinStorageKind, K_SPARSE_THRESHOLD,
};
use std::io::Write;

/// Binned data and mappers of one feature group.
#[derive(Debug)]
pub struct FeatureGroup {
    num_feature_: usize,
    bin_mappers_: Vec<BinMapper>,
    /// Group-global bin boundaries per sub-feature, length `num_feature + 1`
    bin_offsets_: Vec<u32>,
    bin_data_: Box<dyn Bin>,
    is_multi_val_: bool,
    is_sparse_: bool,
    num_total_bin_: i32,
}

fn compute_bin_layout(bin_mappers: &[BinMapper]) -> (Vec<u32>, i32) {
    // slot 0 stores the implicit most-frequent bin
    let mut num_total_bin: i32 = 1;
    let mut bin_offsets = vec![num_total_bin as u32];
    for mapper in bin_mappers {
        let mut num_bin = mapper.num_bin();
        if mapper.most_freq_bin() == 0 {
            num_bin -= 1;
        }
        num_total_bin += num_bin;
        bin_offsets.push(num_total_bin as u32);
    }
    (bin_offsets, num_total_bin)
}

impl FeatureGroup {
    /// Construct a group over `bin_mappers` in bundling order.
    pub fn new(
        bin_mappers: Vec<BinMapper>,
        is_multi_val: bool,
        num_data: DataSizeT,
    ) -> Result<Self> {
        if bin_mappers.is_empty() {
            return Err(DatasetError::config(
                "a feature group requires at least one bin mapper",
            ));
        }
        let (bin_offsets, num_total_bin) = compute_bin_layout(&bin_mappers);
        let num_feature = bin_mappers.len();

        let (bin_data, is_sparse) = if is_multi_val {
            (
                create_multi_val_dense_bin(num_data, num_total_bin, bin_offsets.clone()),
                false,
            )
        } else if num_feature == 1 && bin_mappers[0].sparse_rate() >= K_SPARSE_THRESHOLD {
            (create_sparse_bin(num_data, num_total_bin), true)
        } else {
            (create_dense_bin(num_data, num_total_bin), false)
        };

        Ok(FeatureGroup {
            num_feature_: num_feature,
            bin_mappers_: bin_mappers,
            bin_offsets_: bin_offsets,
            bin_data_: bin_data,
            is_multi_val_: is_multi_val,
            is_sparse_: is_sparse,
            num_total_bin_: num_total_bin,
        })
    }

    /// Construct a single-feature group with an explicit sparsity choice.
    /// Used by validation datasets, which never bundle.
    pub fn new_single_feature(
        bin_mapper: BinMapper,
        num_data: DataSizeT,
        is_sparse: bool,
    ) -> Self {
        let bin_mappers = vec![bin_mapper];
        let (bin_offsets, num_total_bin) = compute_bin_layout(&bin_mappers);
        let bin_data = if is_sparse {
            create_sparse_bin(num_data, num_total_bin)
        } else {
            create_dense_bin(num_data, num_total_bin)
        };
        FeatureGroup {
            num_feature_: 1,
            bin_mappers_: bin_mappers,
            bin_offsets_: bin_offsets,
            bin_data_: bin_data,
            is_multi_val_: false,
            is_sparse_: is_sparse,
            num_total_bin_: num_total_bin,
        }
    }

    /// Copy the schema of `other` with freshly allocated storage for
    /// `num_data` rows.
    pub fn from_schema(other: &FeatureGroup, num_data: DataSizeT) -> Self {
        let bin_data = if other.is_multi_val_ {
            create_multi_val_dense_bin(
                num_data,
                other.num_total_bin_,
                other.bin_offsets_.clone(),
            )
        } else if other.is_sparse_ {
            create_sparse_bin(num_data, other.num_total_bin_)
        } else {
            create_dense_bin(num_data, other.num_total_bin_)
        };
        FeatureGroup {
            num_feature_: other.num_feature_,
            bin_mappers_: other.bin_mappers_.clone(),
            bin_offsets_: other.bin_offsets_.clone(),
            bin_data_: bin_data,
            is_multi_val_: other.is_multi_val_,
            is_sparse_: other.is_sparse_,
            num_total_bin_: other.num_total_bin_,
        }
    }

    /// Push one raw value; converts to a bin and stores it unless the value
    /// sits at the sub-feature's most-frequent bin.
    pub fn push_data(&mut self, tid: usize, sub_feature_idx: usize, line_idx: DataSizeT, value: f64) {
        let mapper = &self.bin_mappers_[sub_feature_idx];
        let bin = mapper.value_to_bin(value);
        let most_freq_bin = mapper.most_freq_bin();
        if bin == most_freq_bin {
            return;
        }
        let adjusted_bin = if most_freq_bin == 0 { bin - 1 } else { bin };
        let global = self.bin_offsets_[sub_feature_idx] + adjusted_bin;
        self.bin_data_.push(tid, line_idx, global);
    }

    /// Called once after all values have been pushed.
    pub fn finish_load(&mut self) {
        self.bin_data_.finish_load();
    }

    /// Change the row capacity.
    pub fn resize(&mut self, num_data: DataSizeT) {
        self.bin_data_.resize(num_data);
    }

    /// Bulk-select rows from the same group of a full dataset.
    pub fn copy_subset(&mut self, full_group: &FeatureGroup, used_indices: &[DataSizeT]) {
        self.bin_data_
            .copy_subset(full_group.bin_data_.as_ref(), used_indices);
    }

    /// Iterator over one sub-feature's raw bin values.
    pub fn sub_feature_iterator(&self, sub_feature: usize) -> Box<dyn BinIterator + '_> {
        let min_bin = self.bin_offsets_[sub_feature];
        let max_bin = self.bin_offsets_[sub_feature + 1] - 1;
        let most_freq_bin = self.bin_mappers_[sub_feature].most_freq_bin();
        self.bin_data_.iterator(min_bin, max_bin, most_freq_bin)
    }

    /// Number of features in this group
    pub fn num_feature(&self) -> usize {
        self.num_feature_
    }

    /// Whether this group uses multi-valued storage
    pub fn is_multi_val(&self) -> bool {
        self.is_multi_val_
    }

    /// Whether this group uses sparse storage
    pub fn is_sparse(&self) -> bool {
        self.is_sparse_
    }

    /// Total number of bins including the implicit slot 0
    pub fn num_total_bin(&self) -> i32 {
        self.num_total_bin_
    }

    /// Group-global bin boundaries per sub-feature
    pub fn bin_offsets(&self) -> &[u32] {
        &self.bin_offsets_
    }

    /// Bin mapper of one sub-feature
    pub fn bin_mapper(&self, sub_feature: usize) -> &BinMapper {
        &self.bin_mappers_[sub_feature]
    }

    /// The group's bin storage
    pub fn bin_data(&self) -> &dyn Bin {
        self.bin_data_.as_ref()
    }

    fn storage_kind(&self) -> BinStorageKind {
        if self.is_multi_val_ {
            BinStorageKind::MultiValDense
        } else if self.is_sparse_ {
            BinStorageKind::Sparse
        } else {
            BinStorageKind::Dense
        }
    }

    /// Serialized payload size in bytes.
    pub fn sizes_in_byte(&self) -> usize {
        let mapper_bytes: usize = self.bin_mappers_.iter().map(|m| m.sizes_in_byte()).sum();
        // storage kind + num_feature + mappers + bin payload
        1 + 4 + mapper_bytes + self.bin_data_.sizes_in_byte()
    }

    /// Write the group payload.
    pub fn save_binary<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_i8(self.storage_kind().to_i8())?;
        writer.write_i32(self.num_feature_ as i32)?;
        for mapper in &self.bin_mappers_ {
            mapper.save_binary(writer)?;
        }
        self.bin_data_.save_binary(writer)?;
        Ok(())
    }

    /// Restore a group payload written by [`FeatureGroup::save_binary`].
    pub fn load_binary(reader: &mut BinaryReader<'_>, num_data: DataSizeT) -> Result<Self> {
        let kind = BinStorageKind::from_i8(reader.read_i8()?)?;
        let num_feature = reader.read_i32()?;
        if num_feature < 1 {
            return Err(DatasetError::serialization(format!(
                "invalid feature count {} in group payload",
                num_feature
            )));
        }
        let mut bin_mappers = Vec::with_capacity(num_feature as usize);
        for _ in 0..num_feature {
            bin_mappers.push(BinMapper::load_binary(reader)?);
        }
        let (bin_offsets, num_total_bin) = compute_bin_layout(&bin_mappers);
        let (mut bin_data, is_multi_val, is_sparse) = match kind {
            BinStorageKind::Dense => (create_dense_bin(num_data, num_total_bin), false, false),
            BinStorageKind::Sparse => (create_sparse_bin(num_data, num_total_bin), false, true),
            BinStorageKind::MultiValDense => (
                create_multi_val_dense_bin(num_data, num_total_bin, bin_offsets.clone()),
                true,
                false,
            ),
        };
        bin_data.load_binary(reader)?;
        Ok(FeatureGroup {
            num_feature_: num_feature as usize,
            bin_mappers_: bin_mappers,
            bin_offsets_: bin_offsets,
            bin_data_: bin_data,
            is_multi_val_: is_multi_val,
            is_sparse_: is_sparse,
            num_total_bin_: num_total_bin,
        })
    }
}

impl Clone for FeatureGroup {
    fn clone(&self) -> Self {
        FeatureGroup {
            num_feature_: self.num_feature_,
            bin_mappers_: self.bin_mappers_.clone(),
            bin_offsets_: self.bin_offsets_.clone(),
            bin_data_: self.bin_data_.clone_bin(),
            is_multi_val_: self.is_multi_val_,
            is_sparse_: self.is_sparse_,
            num_total_bin_: self.num_total_bin_,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::bin::MissingType;

    fn mapper(num_bin: usize, most_freq_bin: u32, sparse_rate: f64) -> BinMapper {
        let mut bounds: Vec<f64> = (0..num_bin - 1).map(|i| i as f64 + 0.5).collect();
        bounds.push(f64::INFINITY);
        BinMapper::from_upper_bounds(bounds, MissingType::None, most_freq_bin, sparse_rate).unwrap()
    }

    #[test]
    fn test_bin_layout_most_freq_zero() {
        let group = FeatureGroup::new(vec![mapper(3, 0, 0.5), mapper(4, 0, 0.5)], false, 10).unwrap();
        // 1 + (3-1) + (4-1) = 6
        assert_eq!(group.num_total_bin(), 6);
        assert_eq!(group.bin_offsets(), &[1, 3, 6]);
    }

    #[test]
    fn test_bin_layout_most_freq_nonzero() {
        let group = FeatureGroup::new(vec![mapper(3, 2, 0.5)], false, 10).unwrap();
        // 1 + 3 = 4, bins 0..=2 at slots 1..=3
        assert_eq!(group.num_total_bin(), 4);
        assert_eq!(group.bin_offsets(), &[1, 4]);
    }

    #[test]
    fn test_push_data_and_iterate() {
        let mut group = FeatureGroup::new(vec![mapper(3, 0, 0.5)], false, 5).unwrap();
        group.push_data(0, 0, 0, 0.0); // bin 0 == most_freq, skipped
        group.push_data(0, 0, 1, 1.0); // bin 1
        group.push_data(0, 0, 2, 2.0); // bin 2
        group.finish_load();
        let mut it = group.sub_feature_iterator(0);
        assert_eq!(it.get(0), 0);
        assert_eq!(it.get(1), 1);
        assert_eq!(it.get(2), 2);
        assert_eq!(it.get(3), 0);
    }

    #[test]
    fn test_sparse_selection_for_single_sparse_feature() {
        let group = FeatureGroup::new(vec![mapper(3, 0, 0.9)], false, 10).unwrap();
        assert!(group.is_sparse());
        let dense = FeatureGroup::new(vec![mapper(3, 0, 0.3)], false, 10).unwrap();
        assert!(!dense.is_sparse());
    }

    #[test]
    fn test_multi_val_group_push_two_features_same_row() {
        let mut group =
            FeatureGroup::new(vec![mapper(3, 0, 0.5), mapper(3, 0, 0.5)], true, 4).unwrap();
        group.push_data(0, 0, 2, 2.0);
        group.push_data(0, 1, 2, 1.0);
        group.finish_load();
        let mut it0 = group.sub_feature_iterator(0);
        let mut it1 = group.sub_feature_iterator(1);
        assert_eq!(it0.get(2), 2);
        assert_eq!(it1.get(2), 1);
    }

    #[test]
    fn test_schema_copy_and_subset() {
        let mut full = FeatureGroup::new(vec![mapper(3, 0, 0.5)], false, 4).unwrap();
        for (row, v) in [(0, 1.0), (2, 2.0)] {
            full.push_data(0, 0, row, v);
        }
        full.finish_load();

        let mut sub = FeatureGroup::from_schema(&full, 2);
        sub.copy_subset(&full, &[0, 2]);
        let mut it = sub.sub_feature_iterator(0);
        assert_eq!(it.get(0), 1);
        assert_eq!(it.get(1), 2);
    }

    #[test]
    fn test_group_binary_round_trip() {
        let mut group =
            FeatureGroup::new(vec![mapper(3, 0, 0.5), mapper(4, 2, 0.5)], false, 4).unwrap();
        group.push_data(0, 0, 1, 2.0);
        group.push_data(0, 1, 3, 0.0);
        group.finish_load();

        let mut writer = BinaryWriter::new(Vec::new());
        group.save_binary(&mut writer).unwrap();
        let buf = writer.into_inner().unwrap();
        assert_eq!(buf.len(), group.sizes_in_byte());

        let mut reader = BinaryReader::new(&buf);
        let restored = FeatureGroup::load_binary(&mut reader, 4).unwrap();
        assert_eq!(restored.num_total_bin(), group.num_total_bin());
        assert_eq!(restored.bin_offsets(), group.bin_offsets());
        let mut it = restored.sub_feature_iterator(0);
        assert_eq!(it.get(1), 2);
    }
}
