//! Dense bin storage: one value per row.
//!
//! Used for every single-valued feature group that is not sparse. The value
//! width is chosen by the factory from the group's total bin count.

use crate::core::error::Result;
use crate::core::meta::*;
use crate::core::utils::{BinaryReader, BinaryWriter};
use crate::io::bin::{Bin, BinIterator};
use std::io::Write;

/// Storable bin value: `u8`, `u16` or `u32`.
pub trait BinValue:
    Copy + Default + PartialOrd + Send + Sync + std::fmt::Debug + 'static
{
    /// Bytes per value in the serialized payload.
    const WIDTH: usize;
    /// Narrow from the group-global bin value.
    fn from_u32(v: u32) -> Self;
    /// Widen to the group-global bin value.
    fn to_u32(self) -> u32;
    /// Append the little-endian encoding to `out`.
    fn write_le(self, out: &mut Vec<u8>);
    /// Decode one value from a little-endian byte slice.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_bin_value {
    ($t:ty, $width:expr) => {
        impl BinValue for $t {
            const WIDTH: usize = $width;

            #[inline(always)]
            fn from_u32(v: u32) -> Self {
                v as $t
            }

            #[inline(always)]
            fn to_u32(self) -> u32 {
                self as u32
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $width];
                buf.copy_from_slice(&bytes[..$width]);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_bin_value!(u8, 1);
impl_bin_value!(u16, 2);
impl_bin_value!(u32, 4);

/// Dense columnar storage of group-global bin values.
#[derive(Debug, Clone)]
pub struct DenseBin<T: BinValue> {
    data_: Vec<T>,
    num_data_: DataSizeT,
}

impl<T: BinValue> DenseBin<T> {
    /// Create zero-initialized storage for `num_data` rows.
    pub fn new(num_data: DataSizeT) -> Self {
        DenseBin {
            data_: vec![T::default(); num_data as usize],
            num_data_: num_data,
        }
    }

    #[inline(always)]
    fn value(&self, idx: DataSizeT) -> u32 {
        self.data_[idx as usize].to_u32()
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
            let ti = (self.value(idx) as usize) << 1;
            out[ti] += ordered_gradients[i as usize] as HistT;
            if USE_HESSIAN {
                out[ti + 1] += ordered_hessians[i as usize] as HistT;
            } else {
                out[ti + 1] += 1.0;
            }
        }
    }
}

/// Iterator over one sub-feature of a dense group storage.
#[derive(Debug)]
pub struct DenseBinIterator<'a, T: BinValue> {
    bin_data: &'a DenseBin<T>,
    min_bin: u32,
    max_bin: u32,
    most_freq_bin: u32,
    offset: u32,
}

impl<'a, T: BinValue> BinIterator for DenseBinIterator<'a, T> {
    fn reset(&mut self, _start_idx: DataSizeT) {}

    fn get(&mut self, idx: DataSizeT) -> u32 {
        let ret = self.bin_data.value(idx);
        if ret >= self.min_bin && ret <= self.max_bin {
            ret - self.min_bin + self.offset
        } else {
            self.most_freq_bin
        }
    }
}

impl<T: BinValue> Bin for DenseBin<T> {
    fn push(&mut self, _tid: usize, idx: DataSizeT, value: u32) {
        self.data_[idx as usize] = T::from_u32(value);
    }

    fn finish_load(&mut self) {}

    fn resize(&mut self, num_data: DataSizeT) {
        self.num_data_ = num_data;
        self.data_.resize(num_data as usize, T::default());
    }

    fn num_data(&self) -> DataSizeT {
        self.num_data_
    }

    fn iterator(&self, min_bin: u32, max_bin: u32, most_freq_bin: u32) -> Box<dyn BinIterator + '_> {
        let offset = if most_freq_bin == 0 { 1 } else { 0 };
        Box::new(DenseBinIterator {
            bin_data: self,
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
            .downcast_ref::<DenseBin<T>>()
            .expect("copy_subset requires matching dense storage");
        for (i, &idx) in used_indices.iter().enumerate() {
            self.data_[i] = src.data_[idx as usize];
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
