//! Multi-valued dense storage: row-major, one slot per bundled sub-feature.
//!
//! Used by multi-valued feature groups, where several bundled features may be
//! away from their most-frequent bin on the same row. Slot `j` of a row holds
//! the group-global bin value of sub-feature `j`, or `0` when that
//! sub-feature sits at its most-frequent bin.

use crate::core::error::Result;
use crate::core::meta::*;
use crate::core::utils::{BinaryReader, BinaryWriter};
use crate::io::bin::{Bin, BinIterator};
use crate::io::dense_bin::BinValue;
use std::io::Write;

/// Row-major multi-value storage of group-global bin values.
#[derive(Debug, Clone)]
pub struct MultiValDenseBin<T: BinValue> {
    data_: Vec<T>,
    num_data_: DataSizeT,
    num_feature_: usize,
    /// Group bin boundaries per sub-feature, length `num_feature + 1`;
    /// `offsets_[0]` is 1 because slot 0 is the implicit bin.
    offsets_: Vec<u32>,
}

impl<T: BinValue> MultiValDenseBin<T> {
    /// Create zero-initialized storage for `num_data` rows.
    pub fn new(num_data: DataSizeT, offsets: Vec<u32>) -> Self {
        assert!(offsets.len() >= 2, "offsets must cover at least one feature");
        let num_feature = offsets.len() - 1;
        MultiValDenseBin {
            data_: vec![T::default(); num_data as usize * num_feature],
            num_data_: num_data,
            num_feature_: num_feature,
            offsets_: offsets,
        }
    }

    /// Number of bundled sub-features.
    pub fn num_feature(&self) -> usize {
        self.num_feature_
    }

    /// Sub-feature whose bin range contains the group-global `value`.
    fn sub_feature_of(&self, value: u32) -> usize {
        debug_assert!(value >= self.offsets_[0] && value < *self.offsets_.last().unwrap());
        self.offsets_.partition_point(|&o| o <= value) - 1
    }

    #[inline(always)]
    fn row_start(&self, idx: DataSizeT) -> usize {
        idx as usize * self.num_feature_
    }

    fn construct_histogram_inner<const USE_INDICES: bool, const USE_HESSIAN: bool>(
        &self,
        data_indices: &[DataSizeT],
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        ordered_hessians: &[ScoreT],
        out: &mut [HistT],
    ) {
        for i in start..end {
            let idx = if USE_INDICES {
                data_indices[i as usize]
            } else {
                i
            };
            let base = self.row_start(idx);
            for j in 0..self.num_feature_ {
                let v = self.data_[base + j].to_u32();
                if v == 0 {
                    continue;
                }
                let ti = (v as usize) << 1;
                out[ti] += ordered_gradients[i as usize] as HistT;
                if USE_HESSIAN {
                    out[ti + 1] += ordered_hessians[i as usize] as HistT;
                } else {
                    out[ti + 1] += 1.0;
                }
            }
        }
    }
}

/// Iterator over one sub-feature slot of a multi-value storage.
#[derive(Debug)]
pub struct MultiValDenseBinIterator<'a, T: BinValue> {
    bin_data: &'a MultiValDenseBin<T>,
    sub_feature: usize,
    min_bin: u32,
    max_bin: u32,
    most_freq_bin: u32,
    offset: u32,
}

impl<'a, T: BinValue> BinIterator for MultiValDenseBinIterator<'a, T> {
    fn reset(&mut self, _start_idx: DataSizeT) {}

    fn get(&mut self, idx: DataSizeT) -> u32 {
        let ret = self.bin_data.data_[self.bin_data.row_start(idx) + self.sub_feature].to_u32();
        if ret >= self.min_bin && ret <= self.max_bin {
            ret - self.min_bin + self.offset
        } else {
            self.most_freq_bin
        }
    }
}

impl<T: BinValue> Bin for MultiValDenseBin<T> {
    fn push(&mut self, _tid: usize, idx: DataSizeT, value: u32) {
        let j = self.sub_feature_of(value);
        let base = self.row_start(idx);
        self.data_[base + j] = T::from_u32(value);
    }

    fn finish_load(&mut self) {}

    fn resize(&mut self, num_data: DataSizeT) {
        self.num_data_ = num_data;
        self.data_
            .resize(num_data as usize * self.num_feature_, T::default());
    }

    fn num_data(&self) -> DataSizeT {
        self.num_data_
    }

    fn iterator(&self, min_bin: u32, max_bin: u32, most_freq_bin: u32) -> Box<dyn BinIterator + '_> {
        let offset = if most_freq_bin == 0 { 1 } else { 0 };
        let sub_feature = self.sub_feature_of(min_bin);
        Box::new(MultiValDenseBinIterator {
            bin_data: self,
            sub_feature,
            min_bin,
            max_bin,
            most_freq_bin,
            offset,
        })
    }

    fn construct_histogram(
        &self,
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        ordered_hessians: &[ScoreT],
        out: &mut [HistT],
    ) {
        self.construct_histogram_inner::<false, true>(
            &[],
            start,
            end,
            ordered_gradients,
            ordered_hessians,
            out,
        );
    }

    fn construct_histogram_indexed(
        &self,
        data_indices: &[DataSizeT],
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        ordered_hessians: &[ScoreT],
        out: &mut [HistT],
    ) {
        self.construct_histogram_inner::<true, true>(
            data_indices,
            start,
            end,
            ordered_gradients,
            ordered_hessians,
            out,
        );
    }

    fn construct_histogram_no_hessian(
        &self,
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        out: &mut [HistT],
    ) {
        self.construct_histogram_inner::<false, false>(&[], start, end, ordered_gradients, &[], out);
    }

    fn construct_histogram_indexed_no_hessian(
        &self,
        data_indices: &[DataSizeT],
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        out: &mut [HistT],
    ) {
        self.construct_histogram_inner::<true, false>(
            data_indices,
            start,
            end,
            ordered_gradients,
            &[],
            out,
        );
    }

    fn copy_subset(&mut self, full_bin: &dyn Bin, used_indices: &[DataSizeT]) {
        let src = full_bin
            .as_any()
            .downcast_ref::<MultiValDenseBin<T>>()
            .expect("copy_subset requires matching multi-value storage");
        for (i, &idx) in used_indices.iter().enumerate() {
            let dst_base = i * self.num_feature_;
            let src_base = src.row_start(idx);
            self.data_[dst_base..dst_base + self.num_feature_]
                .copy_from_slice(&src.data_[src_base..src_base + self.num_feature_]);
        }
    }

    fn sizes_in_byte(&self) -> usize {
        self.data_.len() * T::WIDTH
    }

    fn save_binary(&self, writer: &mut dyn Write) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.sizes_in_byte());
        for &v in &self.data_ {
            v.write_le(&mut bytes);
        }
        let mut writer = BinaryWriter::new(writer);
        writer.write_bytes(&bytes)
    }

    fn load_binary(&mut self, reader: &mut BinaryReader<'_>) -> Result<()> {
        let bytes = reader.read_bytes(self.data_.len() * T::WIDTH)?;
        for (i, chunk) in bytes.chunks_exact(T::WIDTH).enumerate() {
            self.data_[i] = T::read_le(chunk);
        }
        Ok(())
    }

    fn clone_bin(&self) -> Box<dyn Bin> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
