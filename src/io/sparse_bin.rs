//! Sparse bin storage: ordered (row, value) pairs.
//!
//! Chosen for single-feature groups whose mapper reports a sparse rate above
//! the sparse threshold. Pushes are staged in per-thread buffers and merged
//! by `finish_load`, mirroring the multi-threaded loading discipline of the
//! dense path.

use crate::core::error::Result;
use crate::core::meta::*;
use crate::core::utils::{BinaryReader, BinaryWriter};
use crate::io::bin::{Bin, BinIterator};
use crate::io::dense_bin::BinValue;
use std::io::Write;

/// Sparse columnar storage of group-global bin values.
#[derive(Debug, Clone)]
pub struct SparseBin<T: BinValue> {
    push_buffers_: Vec<Vec<(DataSizeT, T)>>,
    indices_: Vec<DataSizeT>,
    vals_: Vec<T>,
    num_data_: DataSizeT,
}

impl<T: BinValue> SparseBin<T> {
    /// Create empty storage for `num_data` rows.
    pub fn new(num_data: DataSizeT) -> Self {
        SparseBin {
            push_buffers_: Vec::new(),
            indices_: Vec::new(),
            vals_: Vec::new(),
            num_data_: num_data,
        }
    }

    /// Number of stored non-default entries.
    pub fn num_entries(&self) -> usize {
        self.indices_.len()
    }

    /// First entry position with row >= `row`.
    fn lower_bound(&self, row: DataSizeT) -> usize {
        self.indices_.partition_point(|&r| r < row)
    }

    /// Stored value of `row`, or `None` when the row sits at the default.
    fn lookup(&self, row: DataSizeT) -> Option<u32> {
        let pos = self.lower_bound(row);
        if pos < self.indices_.len() && self.indices_[pos] == row {
            Some(self.vals_[pos].to_u32())
        } else {
            None
        }
    }
}

/// Cursor-based iterator over a sparse storage.
#[derive(Debug)]
pub struct SparseBinIterator<'a, T: BinValue> {
    bin_data: &'a SparseBin<T>,
    cur_pos: usize,
    min_bin: u32,
    max_bin: u32,
    most_freq_bin: u32,
    offset: u32,
}

impl<'a, T: BinValue> BinIterator for SparseBinIterator<'a, T> {
    fn reset(&mut self, start_idx: DataSizeT) {
        self.cur_pos = self.bin_data.lower_bound(start_idx);
    }

    fn get(&mut self, idx: DataSizeT) -> u32 {
        let indices = &self.bin_data.indices_;
        // callers may probe backwards; fall back to a search
        if self.cur_pos > 0 && indices[self.cur_pos - 1] > idx {
            self.cur_pos = self.bin_data.lower_bound(idx);
        }
        while self.cur_pos < indices.len() && indices[self.cur_pos] < idx {
            self.cur_pos += 1;
        }
        if self.cur_pos < indices.len() && indices[self.cur_pos] == idx {
            let ret = self.bin_data.vals_[self.cur_pos].to_u32();
            if ret >= self.min_bin && ret <= self.max_bin {
                return ret - self.min_bin + self.offset;
            }
        }
        self.most_freq_bin
    }
}

impl<T: BinValue> Bin for SparseBin<T> {
    fn push(&mut self, tid: usize, idx: DataSizeT, value: u32) {
        if tid >= self.push_buffers_.len() {
            self.push_buffers_.resize(tid + 1, Vec::new());
        }
        self.push_buffers_[tid].push((idx, T::from_u32(value)));
    }

    fn finish_load(&mut self) {
        if self.push_buffers_.is_empty() {
            return;
        }
        let mut pairs: Vec<(DataSizeT, T)> = self.push_buffers_.drain(..).flatten().collect();
        pairs.sort_unstable_by_key(|&(row, _)| row);
        self.indices_ = pairs.iter().map(|&(row, _)| row).collect();
        self.vals_ = pairs.iter().map(|&(_, v)| v).collect();
    }

    fn resize(&mut self, num_data: DataSizeT) {
        if num_data < self.num_data_ {
            let keep = self.lower_bound(num_data);
            self.indices_.truncate(keep);
            self.vals_.truncate(keep);
        }
        self.num_data_ = num_data;
    }

    fn num_data(&self) -> DataSizeT {
        self.num_data_
    }

    fn iterator(&self, min_bin: u32, max_bin: u32, most_freq_bin: u32) -> Box<dyn BinIterator + '_> {
        let offset = if most_freq_bin == 0 { 1 } else { 0 };
        Box::new(SparseBinIterator {
            bin_data: self,
            cur_pos: 0,
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
        let mut pos = self.lower_bound(start);
        while pos < self.indices_.len() && self.indices_[pos] < end {
            let row = self.indices_[pos] as usize;
            let ti = (self.vals_[pos].to_u32() as usize) << 1;
            out[ti] += ordered_gradients[row] as HistT;
            out[ti + 1] += ordered_hessians[row] as HistT;
            pos += 1;
        }
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
        for i in start..end {
            if let Some(v) = self.lookup(data_indices[i as usize]) {
                let ti = (v as usize) << 1;
                out[ti] += ordered_gradients[i as usize] as HistT;
                out[ti + 1] += ordered_hessians[i as usize] as HistT;
            }
        }
    }

    fn construct_histogram_no_hessian(
        &self,
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        out: &mut [HistT],
    ) {
        let mut pos = self.lower_bound(start);
        while pos < self.indices_.len() && self.indices_[pos] < end {
            let row = self.indices_[pos] as usize;
            let ti = (self.vals_[pos].to_u32() as usize) << 1;
            out[ti] += ordered_gradients[row] as HistT;
            out[ti + 1] += 1.0;
            pos += 1;
        }
    }

    fn construct_histogram_indexed_no_hessian(
        &self,
        data_indices: &[DataSizeT],
        start: DataSizeT,
        end: DataSizeT,
        ordered_gradients: &[ScoreT],
        out: &mut [HistT],
    ) {
        for i in start..end {
            if let Some(v) = self.lookup(data_indices[i as usize]) {
                let ti = (v as usize) << 1;
                out[ti] += ordered_gradients[i as usize] as HistT;
                out[ti + 1] += 1.0;
            }
        }
    }

    fn copy_subset(&mut self, full_bin: &dyn Bin, used_indices: &[DataSizeT]) {
        let src = full_bin
            .as_any()
            .downcast_ref::<SparseBin<T>>()
            .expect("copy_subset requires matching sparse storage");
        self.indices_.clear();
        self.vals_.clear();
        for (i, &idx) in used_indices.iter().enumerate() {
            if let Some(v) = src.lookup(idx) {
                self.indices_.push(i as DataSizeT);
                self.vals_.push(T::from_u32(v));
            }
        }
    }

    fn sizes_in_byte(&self) -> usize {
        4 + self.indices_.len() * (4 + T::WIDTH)
    }

    fn save_binary(&self, writer: &mut dyn Write) -> Result<()> {
        let mut writer = BinaryWriter::new(writer);
        writer.write_i32(self.indices_.len() as i32)?;
        let mut bytes = Vec::with_capacity(self.indices_.len() * (4 + T::WIDTH));
        for (&row, &v) in self.indices_.iter().zip(self.vals_.iter()) {
            bytes.extend_from_slice(&row.to_le_bytes());
            v.write_le(&mut bytes);
        }
        writer.write_bytes(&bytes)
    }

    fn load_binary(&mut self, reader: &mut BinaryReader<'_>) -> Result<()> {
        let n = reader.read_i32()? as usize;
        self.indices_ = Vec::with_capacity(n);
        self.vals_ = Vec::with_capacity(n);
        for _ in 0..n {
            self.indices_.push(reader.read_i32()?);
            let bytes = reader.read_bytes(T::WIDTH)?;
            self.vals_.push(T::read_le(bytes));
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

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_bin() -> SparseBin<u8> {
        let mut bin = SparseBin::<u8>::new(10);
        for (row, v) in [(2, 1u32), (5, 2), (7, 1)] {
            bin.push(0, row, v);
        }
        bin.finish_load();
        bin
    }

    #[test]
    fn test_finish_load_sorts_multi_thread_pushes() {
        let mut bin = SparseBin::<u8>::new(10);
        bin.push(1, 7, 2);
        bin.push(0, 2, 1);
        bin.push(1, 4, 3);
        bin.finish_load();
        assert_eq!(bin.indices_, vec![2, 4, 7]);
    }

    #[test]
    fn test_construct_histogram_range() {
        let bin = filled_bin();
        let grads = vec![1.0f32; 10];
        let hess = vec![1.0f32; 10];
        let mut out = vec![0.0; 6];
        bin.construct_histogram(0, 10, &grads, &hess, &mut out);
        assert_eq!(out[2], 2.0);
        assert_eq!(out[4], 1.0);
        // default rows never touch the output
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_construct_histogram_partial_range() {
        let bin = filled_bin();
        let grads = vec![1.0f32; 10];
        let hess = vec![1.0f32; 10];
        let mut out = vec![0.0; 6];
        bin.construct_histogram(3, 8, &grads, &hess, &mut out);
        assert_eq!(out[2], 1.0); // row 7
        assert_eq!(out[4], 1.0); // row 5
    }

    #[test]
    fn test_indexed_histogram_uses_gathered_stats() {
        let bin = filled_bin();
        let indices = vec![5, 6, 7];
        let grads = vec![10.0f32, 20.0, 30.0];
        let hess = vec![1.0f32, 1.0, 1.0];
        let mut out = vec![0.0; 6];
        bin.construct_histogram_indexed(&indices, 0, 3, &grads, &hess, &mut out);
        assert_eq!(out[4], 10.0);
        assert_eq!(out[2], 30.0);
    }

    #[test]
    fn test_iterator() {
        let bin = filled_bin();
        let mut it = bin.iterator(1, 2, 0);
        assert_eq!(it.get(0), 0);
        assert_eq!(it.get(2), 1);
        assert_eq!(it.get(5), 2);
        assert_eq!(it.get(9), 0);
    }

    #[test]
    fn test_copy_subset_renumbers_rows() {
        let bin = filled_bin();
        let mut sub = SparseBin::<u8>::new(4);
        sub.copy_subset(&bin, &[4, 5, 6, 7]);
        assert_eq!(sub.indices_, vec![1, 3]);
        assert_eq!(sub.lookup(1), Some(2));
        assert_eq!(sub.lookup(3), Some(1));
    }

    #[test]
    fn test_binary_round_trip() {
        let bin = filled_bin();
        let mut buf = Vec::new();
        bin.save_binary(&mut buf).unwrap();
        assert_eq!(buf.len(), bin.sizes_in_byte());

        let mut restored = SparseBin::<u8>::new(10);
        let mut reader = BinaryReader::new(&buf);
        restored.load_binary(&mut reader).unwrap();
        assert_eq!(restored.indices_, bin.indices_);
        assert_eq!(restored.lookup(5), Some(2));
    }

    #[test]
    fn test_resize_truncates_tail() {
        let mut bin = filled_bin();
        bin.resize(6);
        assert_eq!(bin.num_data(), 6);
        assert_eq!(bin.num_entries(), 2);
    }
}
