//! Per-row training metadata: labels, weights, initial scores and query
//! boundaries.
//!
//! All setters validate lengths against the row count; a mismatch is a
//! contract violation. Weights, init scores and queries are optional and
//! stay empty until set.

use crate::core::error::{DatasetError, Result};
use crate::core::meta::*;
use crate::core::utils::{BinaryReader, BinaryWriter};
use std::io::Write;

/// Per-row labels, weights, init scores and query boundaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    num_data_: DataSizeT,
    label_: Vec<LabelT>,
    weights_: Vec<LabelT>,
    init_score_: Vec<f64>,
    /// Prefix boundaries; length `num_queries + 1` when queries are set
    query_boundaries_: Vec<DataSizeT>,
}

impl Metadata {
    /// Allocate metadata for `num_data` rows.
    pub fn init(&mut self, num_data: DataSizeT) {
        self.num_data_ = num_data;
        self.label_ = vec![0.0; num_data as usize];
        self.weights_.clear();
        self.init_score_.clear();
        self.query_boundaries_.clear();
    }

    /// Build metadata by selecting `used_indices` rows from `other`.
    pub fn init_from(&mut self, other: &Metadata, used_indices: &[DataSizeT]) -> Result<()> {
        let n = used_indices.len();
        self.num_data_ = n as DataSizeT;
        self.label_ = used_indices
            .iter()
            .map(|&i| other.label_[i as usize])
            .collect();
        self.weights_ = if other.weights_.is_empty() {
            Vec::new()
        } else {
            used_indices
                .iter()
                .map(|&i| other.weights_[i as usize])
                .collect()
        };
        self.init_score_ = if other.init_score_.is_empty() {
            Vec::new()
        } else {
            let num_class = other.init_score_.len() / other.num_data_ as usize;
            let mut selected = Vec::with_capacity(n * num_class);
            for k in 0..num_class {
                let base = k * other.num_data_ as usize;
                for &i in used_indices {
                    selected.push(other.init_score_[base + i as usize]);
                }
            }
            selected
        };
        self.query_boundaries_ = if other.query_boundaries_.is_empty() {
            Vec::new()
        } else {
            Self::select_queries(&other.query_boundaries_, used_indices)?
        };
        Ok(())
    }

    fn select_queries(
        boundaries: &[DataSizeT],
        used_indices: &[DataSizeT],
    ) -> Result<Vec<DataSizeT>> {
        // rows of one query must stay contiguous in the selection
        let query_of = |row: DataSizeT| -> usize {
            boundaries.partition_point(|&b| b <= row) - 1
        };
        let mut out = vec![0];
        let mut last_query: Option<usize> = None;
        let mut cnt: DataSizeT = 0;
        for &row in used_indices {
            let q = query_of(row);
            match last_query {
                Some(lq) if lq == q => {}
                Some(lq) if q > lq => {
                    out.push(cnt);
                }
                None => {}
                _ => {
                    return Err(DatasetError::dataset(
                        "subset indices break query ordering",
                    ));
                }
            }
            last_query = Some(q);
            cnt += 1;
        }
        if cnt > 0 {
            out.push(cnt);
        }
        Ok(out)
    }

    /// Set labels; length must equal the row count.
    pub fn set_label(&mut self, label: &[LabelT]) -> Result<()> {
        if label.len() != self.num_data_ as usize {
            return Err(DatasetError::dimension_mismatch(
                self.num_data_.to_string(),
                label.len().to_string(),
            ));
        }
        self.label_ = label.to_vec();
        Ok(())
    }

    /// Set weights; length must equal the row count. An empty slice clears.
    pub fn set_weights(&mut self, weights: &[LabelT]) -> Result<()> {
        if weights.is_empty() {
            self.weights_.clear();
            return Ok(());
        }
        if weights.len() != self.num_data_ as usize {
            return Err(DatasetError::dimension_mismatch(
                self.num_data_.to_string(),
                weights.len().to_string(),
            ));
        }
        self.weights_ = weights.to_vec();
        Ok(())
    }

    /// Set init scores; length must be a positive multiple of the row count
    /// (one block per class). An empty slice clears.
    pub fn set_init_score(&mut self, init_score: &[f64]) -> Result<()> {
        if init_score.is_empty() {
            self.init_score_.clear();
            return Ok(());
        }
        if self.num_data_ == 0 || init_score.len() % self.num_data_ as usize != 0 {
            return Err(DatasetError::dimension_mismatch(
                format!("k * {}", self.num_data_),
                init_score.len().to_string(),
            ));
        }
        self.init_score_ = init_score.to_vec();
        Ok(())
    }

    /// Set queries from per-query row counts; the counts must sum to the row
    /// count. An empty slice clears.
    pub fn set_query(&mut self, query_cnt: &[DataSizeT]) -> Result<()> {
        if query_cnt.is_empty() {
            self.query_boundaries_.clear();
            return Ok(());
        }
        let total: DataSizeT = query_cnt.iter().sum();
        if total != self.num_data_ {
            return Err(DatasetError::dimension_mismatch(
                self.num_data_.to_string(),
                total.to_string(),
            ));
        }
        let mut boundaries = Vec::with_capacity(query_cnt.len() + 1);
        boundaries.push(0);
        let mut acc = 0;
        for &c in query_cnt {
            acc += c;
            boundaries.push(acc);
        }
        self.query_boundaries_ = boundaries;
        Ok(())
    }

    /// Number of rows
    pub fn num_data(&self) -> DataSizeT {
        self.num_data_
    }

    /// Labels
    pub fn label(&self) -> &[LabelT] {
        &self.label_
    }

    /// Weights; empty when unweighted
    pub fn weights(&self) -> &[LabelT] {
        &self.weights_
    }

    /// Init scores; empty when unset
    pub fn init_score(&self) -> &[f64] {
        &self.init_score_
    }

    /// Query boundaries; empty when not a ranking dataset
    pub fn query_boundaries(&self) -> &[DataSizeT] {
        &self.query_boundaries_
    }

    /// Number of queries
    pub fn num_queries(&self) -> DataSizeT {
        if self.query_boundaries_.is_empty() {
            0
        } else {
            (self.query_boundaries_.len() - 1) as DataSizeT
        }
    }

    /// Serialized size in bytes.
    pub fn sizes_in_byte(&self) -> usize {
        4 + 4 + 8 + 4
            + self.label_.len() * 4
            + self.weights_.len() * 4
            + self.init_score_.len() * 8
            + self.query_boundaries_.len() * 4
    }

    /// Write the metadata block.
    pub fn save_binary<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_i32(self.num_data_)?;
        writer.write_i32(self.weights_.len() as i32)?;
        writer.write_usize(self.init_score_.len())?;
        writer.write_i32(self.num_queries())?;
        writer.write_f32_slice(&self.label_)?;
        writer.write_f32_slice(&self.weights_)?;
        writer.write_f64_slice(&self.init_score_)?;
        writer.write_i32_slice(&self.query_boundaries_)?;
        Ok(())
    }

    /// Restore a metadata block written by [`Metadata::save_binary`].
    pub fn load_binary(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let num_data = reader.read_i32()?;
        let num_weights = reader.read_i32()?;
        let num_init_score = reader.read_usize()?;
        let num_queries = reader.read_i32()?;
        let label = reader.read_f32_vec(num_data as usize)?;
        let weights = reader.read_f32_vec(num_weights as usize)?;
        let init_score = reader.read_f64_vec(num_init_score)?;
        let query_boundaries = if num_queries > 0 {
            reader.read_i32_vec(num_queries as usize + 1)?
        } else {
            Vec::new()
        };
        Ok(Metadata {
            num_data_: num_data,
            label_: label,
            weights_: weights,
            init_score_: init_score,
            query_boundaries_: query_boundaries,
        })
    }
}
