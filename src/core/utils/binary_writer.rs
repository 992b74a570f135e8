/*!
 * Copyright (c) 2022 Microsoft Corporation. All rights reserved.
 * Licensed under the MIT License. See LICENSE file in the project root for license information.
 */

//! Fixed-width little-endian field I/O used by the bit-stable dataset format.
//!
//! Every scalar is written at its C width: `bool` as one byte, `usize` block
//! sizes as `u64`. The reader is a cursor over an in-memory byte buffer and
//! fails with a serialization error instead of panicking on truncated input.

use crate::core::error::{DatasetError, Result};
use std::io::Write;

/// Streaming little-endian writer over any [`Write`] sink.
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    inner: W,
    bytes_written: usize,
}

impl<W: Write> BinaryWriter<W> {
    /// Wrap a sink.
    pub fn new(inner: W) -> Self {
        BinaryWriter {
            inner,
            bytes_written: 0,
        }
    }

    /// Total number of bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.bytes_written += data.len();
        Ok(())
    }

    /// Write an `i32` little-endian.
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Write a `u64` little-endian.
    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Write a `usize` as a little-endian `u64`.
    pub fn write_usize(&mut self, v: usize) -> Result<()> {
        self.write_u64(v as u64)
    }

    /// Write an `f64` little-endian.
    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Write an `i8` as one byte.
    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_bytes(&[v as u8])
    }

    /// Write a `bool` as one byte, C style.
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_bytes(&[v as u8])
    }

    /// Write a slice of `i32` values.
    pub fn write_i32_slice(&mut self, values: &[i32]) -> Result<()> {
        for &v in values {
            self.write_i32(v)?;
        }
        Ok(())
    }

    /// Write a slice of `u64` values.
    pub fn write_u64_slice(&mut self, values: &[u64]) -> Result<()> {
        for &v in values {
            self.write_u64(v)?;
        }
        Ok(())
    }

    /// Write a slice of `f64` values.
    pub fn write_f64_slice(&mut self, values: &[f64]) -> Result<()> {
        for &v in values {
            self.write_f64(v)?;
        }
        Ok(())
    }

    /// Write a slice of `i8` values.
    pub fn write_i8_slice(&mut self, values: &[i8]) -> Result<()> {
        for &v in values {
            self.write_i8(v)?;
        }
        Ok(())
    }

    /// Write a slice of `f32` values.
    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.write_bytes(&v.to_le_bytes())?;
        }
        Ok(())
    }
}

impl<W: Write> Write for BinaryWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write_all(buf)?;
        self.bytes_written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Cursor-style reader over an in-memory byte buffer.
#[derive(Debug)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    /// Wrap a byte buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        BinaryReader { buf, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(DatasetError::serialization(format!(
                "truncated input: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read an `i32` little-endian.
    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a `u64` little-endian.
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a `usize` stored as little-endian `u64`.
    pub fn read_usize(&mut self) -> Result<usize> {
        Ok(self.read_u64()? as usize)
    }

    /// Read an `f64` little-endian.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read an `f32` little-endian.
    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read an `i8`.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_bytes(1)?[0] as i8)
    }

    /// Read a one-byte `bool`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bytes(1)?[0] != 0)
    }

    /// Read `n` `i32` values.
    pub fn read_i32_vec(&mut self, n: usize) -> Result<Vec<i32>> {
        (0..n).map(|_| self.read_i32()).collect()
    }

    /// Read `n` `u64` values.
    pub fn read_u64_vec(&mut self, n: usize) -> Result<Vec<u64>> {
        (0..n).map(|_| self.read_u64()).collect()
    }

    /// Read `n` `f64` values.
    pub fn read_f64_vec(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.read_f64()).collect()
    }

    /// Read `n` `i8` values.
    pub fn read_i8_vec(&mut self, n: usize) -> Result<Vec<i8>> {
        (0..n).map(|_| self.read_i8()).collect()
    }

    /// Read `n` `f32` values.
    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        (0..n).map(|_| self.read_f32()).collect()
    }
}
