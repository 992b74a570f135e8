//! The binned training dataset.
//!
//! Owns the feature groups produced by bundling, the feature/group index
//! maps, optional per-feature constraints, per-row metadata, and the
//! histogram construction routine used by the tree learner. Once
//! [`Dataset::finish_load`] has run, binned data is immutable for training;
//! only the row capacity and the monotone/penalty side-vectors may change.

use crate::core::config::{DatasetConfig, DeviceType};
use crate::core::error::{DatasetError, Result};
use crate::core::meta::*;
use crate::core::utils::openmp_wrapper::{install, omp_num_threads, parallel_for_mut};
use crate::core::utils::{ArrayArgs, BinaryReader, BinaryWriter, Log};
use crate::io::bin::BinMapper;
use crate::io::bundle::{fast_feature_bundling, no_group};
use crate::io::feature_group::FeatureGroup;
use crate::io::metadata::Metadata;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// ASCII token leading every binary dataset file.
pub const BINARY_FILE_TOKEN: &[u8] = b"______LightGBM_Binary_File_Token______\n";

const MIN_ROW_SIZE_PER_CHUNK: i64 = 512;
const MIN_BLOCK_SIZE_PER_MERGE: i64 = 512;

/// Columnar, pre-discretized training matrix with bundled feature groups.
#[derive(Debug)]
pub struct Dataset {
    data_filename_: String,
    num_data_: DataSizeT,
    is_finish_load_: bool,
    num_features_: usize,
    num_total_features_: usize,
    num_groups_: usize,
    label_idx_: i32,
    feature_names_: Vec<String>,
    feature_groups_: Vec<FeatureGroup>,
    /// real feature index -> inner feature index, -1 for trivial features
    used_feature_map_: Vec<i32>,
    /// inner feature index -> real feature index
    real_feature_idx_: Vec<i32>,
    feature2group_: Vec<i32>,
    feature2subfeature_: Vec<i32>,
    /// prefix sums of per-group bin counts, length `num_groups + 1`
    group_bin_boundaries_: Vec<u64>,
    group_feature_start_: Vec<i32>,
    group_feature_cnt_: Vec<i32>,
    /// inner indices of features whose default bin differs from the
    /// most-frequent bin; such features need explicit zero pushes
    feature_need_push_zeros_: Vec<i32>,
    monotone_types_: Vec<i8>,
    feature_penalty_: Vec<f64>,
    max_bin_by_feature_: Vec<i32>,
    forced_bin_bounds_: Vec<Vec<f64>>,
    max_bin_: i32,
    min_data_in_bin_: i32,
    bin_construct_sample_cnt_: i32,
    use_missing_: bool,
    zero_as_missing_: bool,
    metadata_: Metadata,
    /// grow-only scratch for the multi-valued histogram path; histogram
    /// calls on one dataset must not overlap
    hist_buf_: Mutex<Vec<HistT>>,
}

impl Dataset {
    /// Create an empty dataset shell.
    pub fn new() -> Self {
        Dataset {
            data_filename_: "noname".to_string(),
            num_data_: 0,
            is_finish_load_: false,
            num_features_: 0,
            num_total_features_: 0,
            num_groups_: 0,
            label_idx_: 0,
            feature_names_: Vec::new(),
            feature_groups_: Vec::new(),
            used_feature_map_: Vec::new(),
            real_feature_idx_: Vec::new(),
            feature2group_: Vec::new(),
            feature2subfeature_: Vec::new(),
            group_bin_boundaries_: Vec::new(),
            group_feature_start_: Vec::new(),
            group_feature_cnt_: Vec::new(),
            feature_need_push_zeros_: Vec::new(),
            monotone_types_: Vec::new(),
            feature_penalty_: Vec::new(),
            max_bin_by_feature_: Vec::new(),
            forced_bin_bounds_: Vec::new(),
            max_bin_: 0,
            min_data_in_bin_: 0,
            bin_construct_sample_cnt_: 0,
            use_missing_: false,
            zero_as_missing_: false,
            metadata_: Metadata::default(),
            hist_buf_: Mutex::new(Vec::new()),
        }
    }

    /// Create a dataset shell for `num_data` rows.
    pub fn with_num_data(num_data: DataSizeT) -> Result<Self> {
        if num_data <= 0 {
            return Err(DatasetError::invalid_parameter(
                "num_data",
                num_data.to_string(),
                "must be greater than 0",
            ));
        }
        let mut dataset = Self::new();
        dataset.num_data_ = num_data;
        dataset.metadata_.init(num_data);
        dataset.group_bin_boundaries_.push(0);
        Ok(dataset)
    }

    /// Bundle features and materialize the feature groups.
    ///
    /// `bin_mappers` is indexed by real feature index; trivial or missing
    /// entries are dropped. Ownership of each mapper moves into its group.
    /// `sample_non_zero_indices`/`sample_values`/`num_per_col` describe the
    /// sampled sparse matrix for the first `num_sample_col` features.
    #[allow(clippy::too_many_arguments)]
    pub fn construct(
        &mut self,
        bin_mappers: &mut Vec<Option<BinMapper>>,
        forced_bins: Vec<Vec<f64>>,
        sample_non_zero_indices: &[&[DataSizeT]],
        sample_values: &[&[f64]],
        num_per_col: &[DataSizeT],
        total_sample_cnt: DataSizeT,
        io_config: &DatasetConfig,
    ) -> Result<()> {
        self.num_total_features_ = bin_mappers.len();
        let num_sample_col = sample_non_zero_indices.len();
        if sample_values.len() != num_sample_col || num_per_col.len() != num_sample_col {
            return Err(DatasetError::dimension_mismatch(
                num_sample_col.to_string(),
                format!("{}/{}", sample_values.len(), num_per_col.len()),
            ));
        }

        let mut used_features = Vec::new();
        for (i, mapper) in bin_mappers.iter().enumerate() {
            if let Some(mapper) = mapper {
                if !mapper.is_trivial() {
                    used_features.push(i);
                }
            }
        }
        if used_features.is_empty() {
            Log::warning(
                "There are no meaningful features, as all feature values are constant.",
            );
        }

        let (features_in_group, group_is_multi_val) =
            if io_config.enable_bundle && !used_features.is_empty() {
                fast_feature_bundling(
                    bin_mappers,
                    sample_non_zero_indices,
                    sample_values,
                    num_per_col,
                    num_sample_col,
                    total_sample_cnt,
                    &used_features,
                    self.num_data_,
                    io_config.device_type == DeviceType::Gpu,
                )
            } else {
                let groups = no_group(&used_features);
                let flags = vec![false; groups.len()];
                (groups, flags)
            };

        self.num_features_ = features_in_group.iter().map(|fs| fs.len()).sum();
        self.num_groups_ = features_in_group.len();
        self.used_feature_map_ = vec![-1; self.num_total_features_];
        self.real_feature_idx_ = vec![0; self.num_features_];
        self.feature2group_ = vec![0; self.num_features_];
        self.feature2subfeature_ = vec![0; self.num_features_];
        self.feature_need_push_zeros_.clear();
        self.feature_groups_.clear();

        let mut cur_fidx = 0usize;
        let mut num_multi_val_group = 0usize;
        for (i, cur_features) in features_in_group.iter().enumerate() {
            if group_is_multi_val[i] {
                num_multi_val_group += 1;
            }
            let mut cur_bin_mappers = Vec::with_capacity(cur_features.len());
            for (j, &real_fidx) in cur_features.iter().enumerate() {
                self.used_feature_map_[real_fidx] = cur_fidx as i32;
                self.real_feature_idx_[cur_fidx] = real_fidx as i32;
                self.feature2group_[cur_fidx] = i as i32;
                self.feature2subfeature_[cur_fidx] = j as i32;
                let mapper = bin_mappers[real_fidx]
                    .take()
                    .expect("bundled feature must still own its bin mapper");
                if mapper.default_bin() != mapper.most_freq_bin() {
                    self.feature_need_push_zeros_.push(cur_fidx as i32);
                }
                cur_bin_mappers.push(mapper);
                cur_fidx += 1;
            }
            self.feature_groups_.push(FeatureGroup::new(
                cur_bin_mappers,
                group_is_multi_val[i],
                self.num_data_,
            )?);
        }
        Log::info(&format!(
            "Total groups {}, multi-val groups {}.",
            self.num_groups_, num_multi_val_group
        ));

        self.group_bin_boundaries_.clear();
        let mut num_total_bin: u64 = 0;
        self.group_bin_boundaries_.push(num_total_bin);
        for group in &self.feature_groups_ {
            num_total_bin += group.num_total_bin() as u64;
            self.group_bin_boundaries_.push(num_total_bin);
        }
        self.rebuild_group_feature_ranges();

        if !io_config.monotone_constraints.is_empty() {
            if io_config.monotone_constraints.len() != self.num_total_features_ {
                return Err(DatasetError::dimension_mismatch(
                    self.num_total_features_.to_string(),
                    io_config.monotone_constraints.len().to_string(),
                ));
            }
            self.monotone_types_ = vec![0; self.num_features_];
            for i in 0..self.num_total_features_ {
                let inner_fidx = self.used_feature_map_[i];
                if inner_fidx >= 0 {
                    self.monotone_types_[inner_fidx as usize] = io_config.monotone_constraints[i];
                }
            }
            if ArrayArgs::check_all_zero(&self.monotone_types_) {
                self.monotone_types_.clear();
            }
        }
        if !io_config.feature_contri.is_empty() {
            if io_config.feature_contri.len() != self.num_total_features_ {
                return Err(DatasetError::dimension_mismatch(
                    self.num_total_features_.to_string(),
                    io_config.feature_contri.len().to_string(),
                ));
            }
            self.feature_penalty_ = vec![0.0; self.num_features_];
            for i in 0..self.num_total_features_ {
                let inner_fidx = self.used_feature_map_[i];
                if inner_fidx >= 0 {
                    self.feature_penalty_[inner_fidx as usize] =
                        io_config.feature_contri[i].max(0.0);
                }
            }
            if ArrayArgs::check_all(&self.feature_penalty_, 1.0) {
                self.feature_penalty_.clear();
            }
        }
        if !io_config.max_bin_by_feature.is_empty() {
            if io_config.max_bin_by_feature.len() != self.num_total_features_ {
                return Err(DatasetError::dimension_mismatch(
                    self.num_total_features_.to_string(),
                    io_config.max_bin_by_feature.len().to_string(),
                ));
            }
            if io_config.max_bin_by_feature.iter().any(|&b| b <= 1) {
                return Err(DatasetError::invalid_parameter(
                    "max_bin_by_feature",
                    "<=1",
                    "all entries must be greater than 1",
                ));
            }
            self.max_bin_by_feature_ = io_config.max_bin_by_feature.clone();
        }
        self.forced_bin_bounds_ = if forced_bins.is_empty() {
            vec![Vec::new(); self.num_total_features_]
        } else {
            if forced_bins.len() != self.num_total_features_ {
                return Err(DatasetError::dimension_mismatch(
                    self.num_total_features_.to_string(),
                    forced_bins.len().to_string(),
                ));
            }
            forced_bins
        };
        if self.feature_names_.len() != self.num_total_features_ {
            self.feature_names_ = (0..self.num_total_features_)
                .map(|i| format!("Column_{}", i))
                .collect();
        }
        self.max_bin_ = io_config.max_bin;
        self.min_data_in_bin_ = io_config.min_data_in_bin;
        self.bin_construct_sample_cnt_ = io_config.bin_construct_sample_cnt;
        self.use_missing_ = io_config.use_missing;
        self.zero_as_missing_ = io_config.zero_as_missing;
        Ok(())
    }

    fn rebuild_group_feature_ranges(&mut self) {
        self.group_feature_start_.clear();
        self.group_feature_cnt_.clear();
        if self.num_features_ == 0 {
            return;
        }
        let mut last_group = 0;
        self.group_feature_start_.push(0);
        self.group_feature_cnt_.push(1);
        for i in 1..self.num_features_ {
            let group = self.feature2group_[i];
            if group == last_group {
                *self.group_feature_cnt_.last_mut().unwrap() += 1;
            } else {
                self.group_feature_start_.push(i as i32);
                self.group_feature_cnt_.push(1);
                last_group = group;
            }
        }
    }

    /// Apply new monotone constraints / feature contributions. Attempts to
    /// change binning parameters only produce warnings.
    pub fn reset_config(&mut self, config: &DatasetConfig) -> Result<()> {
        if config.max_bin != self.max_bin_ {
            Log::warning("Cannot change max_bin after constructed Dataset handle.");
        }
        if !config.max_bin_by_feature.is_empty()
            && config.max_bin_by_feature != self.max_bin_by_feature_
        {
            Log::warning("Cannot change max_bin_by_feature after constructed Dataset handle.");
        }
        if config.bin_construct_sample_cnt != self.bin_construct_sample_cnt_ {
            Log::warning(
                "Cannot change bin_construct_sample_cnt after constructed Dataset handle.",
            );
        }
        if config.min_data_in_bin != self.min_data_in_bin_ {
            Log::warning("Cannot change min_data_in_bin after constructed Dataset handle.");
        }
        if config.use_missing != self.use_missing_ {
            Log::warning("Cannot change use_missing after constructed Dataset handle.");
        }
        if config.zero_as_missing != self.zero_as_missing_ {
            Log::warning("Cannot change zero_as_missing after constructed Dataset handle.");
        }
        if !config.forced_bins_filename.is_empty() {
            Log::warning("Cannot change forced bins after constructed Dataset handle.");
        }

        if !config.monotone_constraints.is_empty() {
            if config.monotone_constraints.len() != self.num_total_features_ {
                return Err(DatasetError::dimension_mismatch(
                    self.num_total_features_.to_string(),
                    config.monotone_constraints.len().to_string(),
                ));
            }
            self.monotone_types_ = vec![0; self.num_features_];
            for i in 0..self.num_total_features_ {
                let inner_fidx = self.used_feature_map_[i];
                if inner_fidx >= 0 {
                    self.monotone_types_[inner_fidx as usize] = config.monotone_constraints[i];
                }
            }
            if ArrayArgs::check_all_zero(&self.monotone_types_) {
                self.monotone_types_.clear();
            }
        }
        if !config.feature_contri.is_empty() {
            if config.feature_contri.len() != self.num_total_features_ {
                return Err(DatasetError::dimension_mismatch(
                    self.num_total_features_.to_string(),
                    config.feature_contri.len().to_string(),
                ));
            }
            self.feature_penalty_ = vec![0.0; self.num_features_];
            for i in 0..self.num_total_features_ {
                let inner_fidx = self.used_feature_map_[i];
                if inner_fidx >= 0 {
                    self.feature_penalty_[inner_fidx as usize] = config.feature_contri[i].max(0.0);
                }
            }
            if ArrayArgs::check_all(&self.feature_penalty_, 1.0) {
                self.feature_penalty_.clear();
            }
        }
        Ok(())
    }

    /// Push a dense row of raw feature values (length `num_total_features`).
    pub fn push_one_row(&mut self, tid: usize, row_idx: DataSizeT, values: &[f64]) -> Result<()> {
        if values.len() != self.num_total_features_ {
            return Err(DatasetError::dimension_mismatch(
                self.num_total_features_.to_string(),
                values.len().to_string(),
            ));
        }
        for (real_fidx, &value) in values.iter().enumerate() {
            let inner_fidx = self.used_feature_map_[real_fidx];
            if inner_fidx >= 0 {
                let group = self.feature2group_[inner_fidx as usize] as usize;
                let sub = self.feature2subfeature_[inner_fidx as usize] as usize;
                self.feature_groups_[group].push_data(tid, sub, row_idx, value);
            }
        }
        Ok(())
    }

    /// Finish loading: flush storage staging buffers, in parallel per group.
    pub fn finish_load(&mut self) {
        if self.is_finish_load_ {
            return;
        }
        if self.num_groups_ > 0 {
            parallel_for_mut(&mut self.feature_groups_, |_, group| group.finish_load());
        }
        self.is_finish_load_ = true;
    }

    /// Deep-copy the schema (mappers and all index maps) of `dataset`,
    /// allocating empty storage sized to this dataset's row count.
    pub fn copy_feature_mapper_from(&mut self, dataset: &Dataset) {
        self.feature_groups_.clear();
        self.num_features_ = dataset.num_features_;
        self.num_groups_ = dataset.num_groups_;
        for group in &dataset.feature_groups_ {
            self.feature_groups_
                .push(FeatureGroup::from_schema(group, self.num_data_));
        }
        self.used_feature_map_ = dataset.used_feature_map_.clone();
        self.num_total_features_ = dataset.num_total_features_;
        self.feature_names_ = dataset.feature_names_.clone();
        self.label_idx_ = dataset.label_idx_;
        self.real_feature_idx_ = dataset.real_feature_idx_.clone();
        self.feature2group_ = dataset.feature2group_.clone();
        self.feature2subfeature_ = dataset.feature2subfeature_.clone();
        self.group_bin_boundaries_ = dataset.group_bin_boundaries_.clone();
        self.group_feature_start_ = dataset.group_feature_start_.clone();
        self.group_feature_cnt_ = dataset.group_feature_cnt_.clone();
        self.monotone_types_ = dataset.monotone_types_.clone();
        self.feature_penalty_ = dataset.feature_penalty_.clone();
        self.forced_bin_bounds_ = dataset.forced_bin_bounds_.clone();
        self.feature_need_push_zeros_ = dataset.feature_need_push_zeros_.clone();
        self.copy_config_from(dataset);
    }

    /// Build a validation-dataset schema from `dataset`: same features, one
    /// feature per group, sparse storage where the mapper is sparse enough.
    pub fn create_valid(&mut self, dataset: &Dataset) {
        self.feature_groups_.clear();
        self.num_features_ = dataset.num_features_;
        self.num_groups_ = self.num_features_;
        self.feature2group_.clear();
        self.feature2subfeature_.clear();
        self.feature_need_push_zeros_.clear();
        for i in 0..self.num_features_ {
            let mapper = dataset.feature_bin_mapper(i).clone();
            if mapper.default_bin() != mapper.most_freq_bin() {
                self.feature_need_push_zeros_.push(i as i32);
            }
            let is_sparse = mapper.sparse_rate() > 0.8;
            self.feature_groups_.push(FeatureGroup::new_single_feature(
                mapper,
                self.num_data_,
                is_sparse,
            ));
            self.feature2group_.push(i as i32);
            self.feature2subfeature_.push(0);
        }
        self.used_feature_map_ = dataset.used_feature_map_.clone();
        self.num_total_features_ = dataset.num_total_features_;
        self.feature_names_ = dataset.feature_names_.clone();
        self.label_idx_ = dataset.label_idx_;
        self.real_feature_idx_ = dataset.real_feature_idx_.clone();
        self.group_bin_boundaries_.clear();
        let mut num_total_bin: u64 = 0;
        self.group_bin_boundaries_.push(num_total_bin);
        for group in &self.feature_groups_ {
            num_total_bin += group.num_total_bin() as u64;
            self.group_bin_boundaries_.push(num_total_bin);
        }
        self.rebuild_group_feature_ranges();
        self.monotone_types_ = dataset.monotone_types_.clone();
        self.feature_penalty_ = dataset.feature_penalty_.clone();
        self.forced_bin_bounds_ = dataset.forced_bin_bounds_.clone();
        self.copy_config_from(dataset);
    }

    fn copy_config_from(&mut self, dataset: &Dataset) {
        self.max_bin_ = dataset.max_bin_;
        self.min_data_in_bin_ = dataset.min_data_in_bin_;
        self.bin_construct_sample_cnt_ = dataset.bin_construct_sample_cnt_;
        self.use_missing_ = dataset.use_missing_;
        self.zero_as_missing_ = dataset.zero_as_missing_;
    }

    /// Change the row capacity of every group, in parallel.
    pub fn re_size(&mut self, num_data: DataSizeT) {
        if self.num_data_ != num_data {
            self.num_data_ = num_data;
            parallel_for_mut(&mut self.feature_groups_, |_, group| group.resize(num_data));
        }
    }

    /// Fill this dataset with the `used_indices` rows of `fullset`. The
    /// receiver must already carry the same schema and have
    /// `num_data == used_indices.len()`.
    pub fn copy_subset(
        &mut self,
        fullset: &Dataset,
        used_indices: &[DataSizeT],
        need_meta_data: bool,
    ) -> Result<()> {
        if used_indices.len() != self.num_data_ as usize {
            return Err(DatasetError::dimension_mismatch(
                self.num_data_.to_string(),
                used_indices.len().to_string(),
            ));
        }
        parallel_for_mut(&mut self.feature_groups_, |group, dst| {
            dst.copy_subset(&fullset.feature_groups_[group], used_indices);
        });
        if need_meta_data {
            self.metadata_.init_from(&fullset.metadata_, used_indices)?;
        }
        self.is_finish_load_ = true;
        Ok(())
    }

    /// Column-concatenate `other` at an identical row count, renumbering its
    /// feature and group maps by this dataset's current sizes.
    pub fn add_features_from(&mut self, other: &Dataset) -> Result<()> {
        if other.num_data_ != self.num_data_ {
            return Err(DatasetError::dataset(
                "Cannot add features from other Dataset with a different number of rows",
            ));
        }
        push_vector(&mut self.feature_names_, &other.feature_names_);
        push_vector(&mut self.feature2subfeature_, &other.feature2subfeature_);
        push_vector(&mut self.group_feature_cnt_, &other.group_feature_cnt_);
        push_vector(&mut self.forced_bin_bounds_, &other.forced_bin_bounds_);
        for group in &other.feature_groups_ {
            self.feature_groups_.push(group.clone());
        }
        for &feature_idx in &other.used_feature_map_ {
            if feature_idx >= 0 {
                self.used_feature_map_
                    .push(feature_idx + self.num_features_ as i32);
            } else {
                self.used_feature_map_.push(-1);
            }
        }
        push_offset(
            &mut self.real_feature_idx_,
            &other.real_feature_idx_,
            self.num_total_features_ as i32,
        );
        push_offset(
            &mut self.feature2group_,
            &other.feature2group_,
            self.num_groups_ as i32,
        );
        let bin_offset = *self.group_bin_boundaries_.last().unwrap();
        // skip the leading 0 of the other boundary list
        for &b in other.group_bin_boundaries_.iter().skip(1) {
            self.group_bin_boundaries_.push(b + bin_offset);
        }
        push_offset(
            &mut self.group_feature_start_,
            &other.group_feature_start_,
            self.num_features_ as i32,
        );

        push_clear_if_empty(
            &mut self.monotone_types_,
            self.num_features_,
            &other.monotone_types_,
            other.num_features_,
            0i8,
        );
        push_clear_if_empty(
            &mut self.feature_penalty_,
            self.num_features_,
            &other.feature_penalty_,
            other.num_features_,
            1.0f64,
        );
        push_clear_if_empty(
            &mut self.max_bin_by_feature_,
            self.num_total_features_,
            &other.max_bin_by_feature_,
            other.num_total_features_,
            -1i32,
        );

        self.num_features_ += other.num_features_;
        self.num_total_features_ += other.num_total_features_;
        self.num_groups_ += other.num_groups_;
        Ok(())
    }

    // ---- field accessors ------------------------------------------------

    /// Set a float field by name. Returns `Ok(false)` for unknown names.
    pub fn set_float_field(&mut self, field_name: &str, data: &[LabelT]) -> Result<bool> {
        match field_name.trim() {
            "label" | "target" => self.metadata_.set_label(data).map(|_| true),
            "weight" | "weights" => self.metadata_.set_weights(data).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Set a double field by name. Returns `Ok(false)` for unknown names.
    pub fn set_double_field(&mut self, field_name: &str, data: &[f64]) -> Result<bool> {
        match field_name.trim() {
            "init_score" => self.metadata_.set_init_score(data).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Set an int field by name. Returns `Ok(false)` for unknown names.
    pub fn set_int_field(&mut self, field_name: &str, data: &[DataSizeT]) -> Result<bool> {
        match field_name.trim() {
            "query" | "group" => self.metadata_.set_query(data).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Get a float field by name; `None` when the name is not handled.
    pub fn get_float_field(&self, field_name: &str) -> Option<&[LabelT]> {
        match field_name.trim() {
            "label" | "target" => Some(self.metadata_.label()),
            "weight" | "weights" => Some(self.metadata_.weights()),
            _ => None,
        }
    }

    /// Get a double field by name; `None` when the name is not handled.
    pub fn get_double_field(&self, field_name: &str) -> Option<&[f64]> {
        match field_name.trim() {
            "init_score" => Some(self.metadata_.init_score()),
            "feature_penalty" => Some(&self.feature_penalty_),
            _ => None,
        }
    }

    /// Get an int field by name; `None` when the name is not handled.
    pub fn get_int_field(&self, field_name: &str) -> Option<&[DataSizeT]> {
        match field_name.trim() {
            "query" | "group" => Some(self.metadata_.query_boundaries()),
            _ => None,
        }
    }

    /// Get an int8 field by name; `None` when the name is not handled.
    pub fn get_int8_field(&self, field_name: &str) -> Option<&[i8]> {
        match field_name.trim() {
            "monotone_constraints" => Some(&self.monotone_types_),
            _ => None,
        }
    }

    // ---- histograms -----------------------------------------------------

    /// Build per-bin `(Σg, Σh)` histograms for every used feature group.
    ///
    /// `hist_data` must span `2 * num_total_bins()` entries. When
    /// `data_indices` selects a strict row subset, gradients and hessians
    /// are first gathered into the `ordered_*` scratch buffers. With
    /// `is_constant_hessian`, `hessians[0]` scales every hessian slot.
    #[allow(clippy::too_many_arguments)]
    pub fn construct_histograms(
        &self,
        is_feature_used: &[bool],
        data_indices: Option<&[DataSizeT]>,
        num_data: DataSizeT,
        leaf_idx: i32,
        gradients: &[ScoreT],
        hessians: &[ScoreT],
        ordered_gradients: &mut [ScoreT],
        ordered_hessians: &mut [ScoreT],
        is_constant_hessian: bool,
        hist_data: &mut [HistT],
    ) {
        if leaf_idx < 0 || num_data < 0 || hist_data.is_empty() {
            return;
        }
        let num_threads = omp_num_threads();

        let mut used_dense_group = Vec::with_capacity(self.num_groups_);
        let mut used_sparse_group = Vec::with_capacity(self.num_groups_);
        for group in 0..self.num_groups_ {
            let f_cnt = self.group_feature_cnt_[group];
            let f_start = self.group_feature_start_[group];
            let is_group_used = (0..f_cnt)
                .any(|j| is_feature_used[(f_start + j) as usize]);
            if is_group_used {
                if self.feature_groups_[group].is_multi_val() {
                    used_sparse_group.push(group);
                } else {
                    used_dense_group.push(group);
                }
            }
        }

        // subset scatter: gather per-leaf statistics into the scratch buffers
        let use_indices = match data_indices {
            Some(indices) if num_data < self.num_data_ => Some(indices),
            _ => None,
        };
        let (ptr_ordered_grad, ptr_ordered_hess): (&[ScoreT], &[ScoreT]) =
            if let Some(indices) = use_indices {
                let n = num_data as usize;
                if !is_constant_hessian {
                    install(|| {
                        ordered_gradients[..n]
                            .par_iter_mut()
                            .zip(ordered_hessians[..n].par_iter_mut())
                            .zip(indices[..n].par_iter())
                            .for_each(|((g, h), &idx)| {
                                *g = gradients[idx as usize];
                                *h = hessians[idx as usize];
                            });
                    });
                } else {
                    install(|| {
                        ordered_gradients[..n]
                            .par_iter_mut()
                            .zip(indices[..n].par_iter())
                            .for_each(|(g, &idx)| *g = gradients[idx as usize]);
                    });
                }
                (&ordered_gradients[..], &ordered_hessians[..])
            } else {
                (gradients, hessians)
            };

        // dense groups: each one owns a disjoint slice of the output
        {
            let jobs = self.split_group_slices(hist_data, &used_dense_group);
            install(|| {
                jobs.into_par_iter().for_each(|(group, out)| {
                    out.fill(0.0);
                    let bin_data = self.feature_groups_[group].bin_data();
                    match (use_indices, is_constant_hessian) {
                        (Some(indices), false) => bin_data.construct_histogram_indexed(
                            indices,
                            0,
                            num_data,
                            ptr_ordered_grad,
                            ptr_ordered_hess,
                            out,
                        ),
                        (Some(indices), true) => {
                            bin_data.construct_histogram_indexed_no_hessian(
                                indices,
                                0,
                                num_data,
                                ptr_ordered_grad,
                                out,
                            );
                            let scale = hessians[0] as HistT;
                            for slot in out.iter_mut().skip(1).step_by(2) {
                                *slot *= scale;
                            }
                        }
                        (None, false) => bin_data.construct_histogram(
                            0,
                            num_data,
                            ptr_ordered_grad,
                            ptr_ordered_hess,
                            out,
                        ),
                        (None, true) => {
                            bin_data.construct_histogram_no_hessian(
                                0,
                                num_data,
                                ptr_ordered_grad,
                                out,
                            );
                            let scale = hessians[0] as HistT;
                            for slot in out.iter_mut().skip(1).step_by(2) {
                                *slot *= scale;
                            }
                        }
                    }
                });
            });
        }

        // multi-valued groups: chunked accumulation into the shared scratch,
        // then a parallel merge over bin blocks that never touches bin 0
        if !used_sparse_group.is_empty() {
            let mut hist_buf_guard = self
                .hist_buf_
                .lock()
                .expect("histogram scratch lock poisoned");
            let hist_buf: &mut Vec<HistT> = &mut hist_buf_guard;
            for &group in &used_sparse_group {
                let num_bin = self.feature_groups_[group].num_total_bin() as i64;
                if (2 * num_bin * num_threads as i64) as usize > hist_buf.len() {
                    hist_buf.resize((2 * num_bin * num_threads as i64) as usize, 0.0);
                    Log::debug(&format!("number of buffered bins {}", num_bin));
                }
                let n_part = (num_threads as i64)
                    .min((num_data as i64 + MIN_ROW_SIZE_PER_CHUNK - 1) / MIN_ROW_SIZE_PER_CHUNK)
                    .max(1);
                let step = (num_data as i64 + n_part - 1) / n_part;

                let bin_data = self.feature_groups_[group].bin_data();
                install(|| {
                    hist_buf
                        .par_chunks_mut(2 * num_bin as usize)
                        .take(n_part as usize)
                        .enumerate()
                        .for_each(|(tid, chunk)| {
                            chunk.fill(0.0);
                            let start = (tid as i64 * step).min(num_data as i64) as DataSizeT;
                            let end = ((tid as i64 + 1) * step).min(num_data as i64) as DataSizeT;
                            match (use_indices, is_constant_hessian) {
                                (Some(indices), false) => bin_data.construct_histogram_indexed(
                                    indices,
                                    start,
                                    end,
                                    ptr_ordered_grad,
                                    ptr_ordered_hess,
                                    chunk,
                                ),
                                (Some(indices), true) => bin_data
                                    .construct_histogram_indexed_no_hessian(
                                        indices,
                                        start,
                                        end,
                                        ptr_ordered_grad,
                                        chunk,
                                    ),
                                (None, false) => bin_data.construct_histogram(
                                    start,
                                    end,
                                    ptr_ordered_grad,
                                    ptr_ordered_hess,
                                    chunk,
                                ),
                                (None, true) => bin_data.construct_histogram_no_hessian(
                                    start,
                                    end,
                                    ptr_ordered_grad,
                                    chunk,
                                ),
                            }
                        });
                });

                let out_start = (self.group_bin_boundaries_[group] * 2) as usize;
                let out = &mut hist_data[out_start..out_start + 2 * num_bin as usize];
                out.fill(0.0);

                let n_block = (num_threads as i64)
                    .min((num_bin + MIN_BLOCK_SIZE_PER_MERGE - 2) / MIN_BLOCK_SIZE_PER_MERGE)
                    .max(1);
                let num_bin_per_block = (num_bin + n_block - 2) / n_block;
                let scale = hessians[0] as HistT;
                let src: &[HistT] = hist_buf;
                // bin 0 is the implicit bin; it stays zero here and is
                // repaired later by fix_histogram
                let (_bin0, merge_area) = out.split_at_mut(2);
                // each block owns bins [start_bin, start_bin + len/2)
                let mut blocks: Vec<(i64, &mut [HistT])> = Vec::new();
                {
                    let mut remaining = merge_area;
                    let mut bin = 1i64;
                    while !remaining.is_empty() {
                        let len = (2 * num_bin_per_block as usize).min(remaining.len());
                        let (head, tail) = remaining.split_at_mut(len);
                        blocks.push((bin, head));
                        bin += num_bin_per_block;
                        remaining = tail;
                    }
                }
                install(|| {
                    blocks.into_par_iter().for_each(|(start_bin, block)| {
                        let n_bins = block.len() / 2;
                        for tid in 0..n_part as usize {
                            let src_base = tid * 2 * num_bin as usize;
                            for b in 0..n_bins {
                                let s = src_base + 2 * (start_bin as usize + b);
                                block[2 * b] += src[s];
                                block[2 * b + 1] += src[s + 1];
                            }
                        }
                        if is_constant_hessian {
                            for slot in block.iter_mut().skip(1).step_by(2) {
                                *slot *= scale;
                            }
                        }
                    });
                });
            }
        }
    }

    /// Split `hist_data` into one mutable slice per listed group.
    fn split_group_slices<'a>(
        &self,
        hist_data: &'a mut [HistT],
        groups: &[usize],
    ) -> Vec<(usize, &'a mut [HistT])> {
        let mut jobs = Vec::with_capacity(groups.len());
        let mut rest = hist_data;
        let mut consumed = 0usize;
        for &group in groups {
            let start = self.group_bin_boundaries_[group] as usize * K_HIST_ENTRY_SIZE;
            let len = self.feature_groups_[group].num_total_bin() as usize * K_HIST_ENTRY_SIZE;
            let (_skipped, tail) = rest.split_at_mut(start - consumed);
            let (slice, tail) = tail.split_at_mut(len);
            jobs.push((group, slice));
            consumed = start + len;
            rest = tail;
        }
        jobs
    }

    /// Repair a feature histogram's most-frequent bin from the leaf totals.
    ///
    /// `data` is the feature-level histogram indexed by raw feature bin.
    pub fn fix_histogram(
        &self,
        feature_idx: usize,
        sum_gradient: HistT,
        sum_hessian: HistT,
        data: &mut [HistT],
    ) {
        let group = self.feature2group_[feature_idx] as usize;
        let sub_feature = self.feature2subfeature_[feature_idx] as usize;
        let bin_mapper = self.feature_groups_[group].bin_mapper(sub_feature);
        let most_freq_bin = bin_mapper.most_freq_bin() as usize;
        if most_freq_bin > 0 {
            let num_bin = bin_mapper.num_bin() as usize;
            data[grad_slot(most_freq_bin)] = sum_gradient;
            data[hess_slot(most_freq_bin)] = sum_hessian;
            for i in 0..num_bin {
                if i != most_freq_bin {
                    data[grad_slot(most_freq_bin)] -= data[grad_slot(i)];
                    data[hess_slot(most_freq_bin)] -= data[hess_slot(i)];
                }
            }
        }
    }

    // ---- serialization --------------------------------------------------

    fn header_size(&self) -> usize {
        let mut size = 7 * 4 + 2; // seven i32 scalars + two bools
        size += 4 * self.num_total_features_; // used_feature_map
        size += 4; // num_groups
        size += 3 * 4 * self.num_features_;
        size += 8 * (self.num_groups_ + 1);
        size += 2 * 4 * self.num_groups_;
        size += self.num_features_; // monotone types
        size += 8 * self.num_features_; // feature penalty
        size += 4 * self.num_total_features_; // max bin by feature
        for name in &self.feature_names_ {
            size += 4 + name.len();
        }
        for bounds in &self.forced_bin_bounds_ {
            size += 4 + 8 * bounds.len();
        }
        size
    }

    /// Save the dataset to the bit-stable binary format.
    ///
    /// With `None` or an empty name, appends `.bin` to the source filename.
    /// Refuses (with a warning, not an error) to overwrite the source file
    /// or any existing file.
    pub fn save_binary_file(&mut self, bin_filename: Option<&str>) -> Result<()> {
        let bin_filename = match bin_filename {
            Some(name) if !name.is_empty() => {
                if name == self.data_filename_ {
                    Log::warning(&format!("Binary file {} already exists", name));
                    return Ok(());
                }
                name.to_string()
            }
            _ => format!("{}.bin", self.data_filename_),
        };
        if Path::new(&bin_filename).exists() {
            Log::warning(&format!(
                "File {} exists, cannot save binary to it",
                bin_filename
            ));
            return Ok(());
        }
        Log::info(&format!("Saving data to binary file {}", bin_filename));
        let file = File::create(&bin_filename)?;
        let mut writer = BinaryWriter::new(BufWriter::new(file));
        self.save_binary_to_writer(&mut writer)?;
        writer.into_inner()?.flush()?;
        Ok(())
    }

    fn save_binary_to_writer<W: Write>(&mut self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_bytes(BINARY_FILE_TOKEN)?;
        writer.write_usize(self.header_size())?;
        writer.write_i32(self.num_data_)?;
        writer.write_i32(self.num_features_ as i32)?;
        writer.write_i32(self.num_total_features_ as i32)?;
        writer.write_i32(self.label_idx_)?;
        writer.write_i32(self.max_bin_)?;
        writer.write_i32(self.bin_construct_sample_cnt_)?;
        writer.write_i32(self.min_data_in_bin_)?;
        writer.write_bool(self.use_missing_)?;
        writer.write_bool(self.zero_as_missing_)?;
        writer.write_i32_slice(&self.used_feature_map_)?;
        writer.write_i32(self.num_groups_ as i32)?;
        writer.write_i32_slice(&self.real_feature_idx_)?;
        writer.write_i32_slice(&self.feature2group_)?;
        writer.write_i32_slice(&self.feature2subfeature_)?;
        writer.write_u64_slice(&self.group_bin_boundaries_)?;
        writer.write_i32_slice(&self.group_feature_start_)?;
        writer.write_i32_slice(&self.group_feature_cnt_)?;
        // logically-empty side vectors are materialized with their defaults
        // for the fixed-width layout, then compacted back
        if self.monotone_types_.is_empty() {
            ArrayArgs::assign(&mut self.monotone_types_, 0, self.num_features_);
        }
        writer.write_i8_slice(&self.monotone_types_)?;
        if ArrayArgs::check_all_zero(&self.monotone_types_) {
            self.monotone_types_.clear();
        }
        if self.feature_penalty_.is_empty() {
            ArrayArgs::assign(&mut self.feature_penalty_, 1.0, self.num_features_);
        }
        writer.write_f64_slice(&self.feature_penalty_)?;
        if ArrayArgs::check_all(&self.feature_penalty_, 1.0) {
            self.feature_penalty_.clear();
        }
        if self.max_bin_by_feature_.is_empty() {
            ArrayArgs::assign(&mut self.max_bin_by_feature_, -1, self.num_total_features_);
        }
        writer.write_i32_slice(&self.max_bin_by_feature_)?;
        if ArrayArgs::check_all(&self.max_bin_by_feature_, -1) {
            self.max_bin_by_feature_.clear();
        }
        for name in &self.feature_names_ {
            writer.write_i32(name.len() as i32)?;
            writer.write_bytes(name.as_bytes())?;
        }
        for bounds in &self.forced_bin_bounds_ {
            writer.write_i32(bounds.len() as i32)?;
            writer.write_f64_slice(bounds)?;
        }
        writer.write_usize(self.metadata_.sizes_in_byte())?;
        self.metadata_.save_binary(writer)?;
        for group in &self.feature_groups_ {
            writer.write_usize(group.sizes_in_byte())?;
            group.save_binary(writer)?;
        }
        Ok(())
    }

    /// Load a dataset written by [`Dataset::save_binary_file`].
    pub fn load_from_binary_file(bin_filename: &str) -> Result<Dataset> {
        let bytes = std::fs::read(bin_filename)?;
        let mut dataset = Self::load_from_bytes(&bytes)?;
        dataset.data_filename_ = bin_filename.to_string();
        Ok(dataset)
    }

    /// Parse a serialized dataset from memory.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<Dataset> {
        let mut reader = BinaryReader::new(bytes);
        let token = reader.read_bytes(BINARY_FILE_TOKEN.len())?;
        if token != BINARY_FILE_TOKEN {
            return Err(DatasetError::serialization(
                "input is not a LightGBM binary dataset file",
            ));
        }
        let size_of_header = reader.read_usize()?;
        let header_start = reader.position();

        let mut dataset = Dataset::new();
        dataset.num_data_ = reader.read_i32()?;
        dataset.num_features_ = reader.read_i32()? as usize;
        dataset.num_total_features_ = reader.read_i32()? as usize;
        dataset.label_idx_ = reader.read_i32()?;
        dataset.max_bin_ = reader.read_i32()?;
        dataset.bin_construct_sample_cnt_ = reader.read_i32()?;
        dataset.min_data_in_bin_ = reader.read_i32()?;
        dataset.use_missing_ = reader.read_bool()?;
        dataset.zero_as_missing_ = reader.read_bool()?;
        dataset.used_feature_map_ = reader.read_i32_vec(dataset.num_total_features_)?;
        dataset.num_groups_ = reader.read_i32()? as usize;
        dataset.real_feature_idx_ = reader.read_i32_vec(dataset.num_features_)?;
        dataset.feature2group_ = reader.read_i32_vec(dataset.num_features_)?;
        dataset.feature2subfeature_ = reader.read_i32_vec(dataset.num_features_)?;
        dataset.group_bin_boundaries_ = reader.read_u64_vec(dataset.num_groups_ + 1)?;
        dataset.group_feature_start_ = reader.read_i32_vec(dataset.num_groups_)?;
        dataset.group_feature_cnt_ = reader.read_i32_vec(dataset.num_groups_)?;
        dataset.monotone_types_ = reader.read_i8_vec(dataset.num_features_)?;
        if ArrayArgs::check_all_zero(&dataset.monotone_types_) {
            dataset.monotone_types_.clear();
        }
        dataset.feature_penalty_ = reader.read_f64_vec(dataset.num_features_)?;
        if ArrayArgs::check_all(&dataset.feature_penalty_, 1.0) {
            dataset.feature_penalty_.clear();
        }
        dataset.max_bin_by_feature_ = reader.read_i32_vec(dataset.num_total_features_)?;
        if ArrayArgs::check_all(&dataset.max_bin_by_feature_, -1) {
            dataset.max_bin_by_feature_.clear();
        }
        dataset.feature_names_ = (0..dataset.num_total_features_)
            .map(|_| -> Result<String> {
                let len = reader.read_i32()? as usize;
                let raw = reader.read_bytes(len)?;
                String::from_utf8(raw.to_vec())
                    .map_err(|e| DatasetError::serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        dataset.forced_bin_bounds_ = (0..dataset.num_total_features_)
            .map(|_| -> Result<Vec<f64>> {
                let n = reader.read_i32()? as usize;
                reader.read_f64_vec(n)
            })
            .collect::<Result<Vec<_>>>()?;
        if reader.position() - header_start != size_of_header {
            return Err(DatasetError::serialization(format!(
                "header size mismatch: expected {}, parsed {}",
                size_of_header,
                reader.position() - header_start
            )));
        }

        let size_of_metadata = reader.read_usize()?;
        let metadata_start = reader.position();
        dataset.metadata_ = Metadata::load_binary(&mut reader)?;
        if reader.position() - metadata_start != size_of_metadata {
            return Err(DatasetError::serialization(
                "metadata size mismatch in binary file",
            ));
        }

        for _ in 0..dataset.num_groups_ {
            let size_of_feature = reader.read_usize()?;
            let group_start = reader.position();
            dataset
                .feature_groups_
                .push(FeatureGroup::load_binary(&mut reader, dataset.num_data_)?);
            if reader.position() - group_start != size_of_feature {
                return Err(DatasetError::serialization(
                    "feature group size mismatch in binary file",
                ));
            }
        }
        dataset.is_finish_load_ = true;
        Ok(dataset)
    }

    /// Dump a human-readable text rendition; not a round-trip format.
    pub fn dump_text_file(&self, text_filename: &str) -> Result<()> {
        let file = File::create(text_filename)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "num_features: {}", self.num_features_)?;
        writeln!(w, "num_total_features: {}", self.num_total_features_)?;
        writeln!(w, "num_groups: {}", self.num_groups_)?;
        writeln!(w, "num_data: {}", self.num_data_)?;
        write!(w, "feature_names: ")?;
        for name in &self.feature_names_ {
            write!(w, "{}, ", name)?;
        }
        write!(w, "\nmonotone_constraints: ")?;
        for m in &self.monotone_types_ {
            write!(w, "{}, ", m)?;
        }
        write!(w, "\nfeature_penalty: ")?;
        for p in &self.feature_penalty_ {
            write!(w, "{:.6}, ", p)?;
        }
        write!(w, "\nmax_bin_by_feature: ")?;
        for b in &self.max_bin_by_feature_ {
            write!(w, "{}, ", b)?;
        }
        write!(w, "\nforced_bins: ")?;
        for (i, bounds) in self.forced_bin_bounds_.iter().enumerate() {
            write!(w, "\nfeature {}: ", i)?;
            for b in bounds {
                write!(w, "{:.6}, ", b)?;
            }
        }
        let mut iterators: Vec<_> = (0..self.num_features_)
            .map(|j| {
                let group_idx = self.feature2group_[j] as usize;
                let sub_idx = self.feature2subfeature_[j] as usize;
                self.feature_groups_[group_idx].sub_feature_iterator(sub_idx)
            })
            .collect();
        for i in 0..self.num_data_ {
            writeln!(w)?;
            for j in 0..self.num_total_features_ {
                let inner_feature_idx = self.used_feature_map_[j];
                if inner_feature_idx < 0 {
                    write!(w, "NA, ")?;
                } else {
                    write!(w, "{}, ", iterators[inner_feature_idx as usize].get(i))?;
                }
            }
        }
        w.flush()?;
        Ok(())
    }

    // ---- accessors ------------------------------------------------------

    /// Number of rows
    pub fn num_data(&self) -> DataSizeT {
        self.num_data_
    }

    /// Number of non-trivial features
    pub fn num_features(&self) -> usize {
        self.num_features_
    }

    /// Number of features including trivial ones
    pub fn num_total_features(&self) -> usize {
        self.num_total_features_
    }

    /// Number of feature groups
    pub fn num_groups(&self) -> usize {
        self.num_groups_
    }

    /// Total bin count over all groups
    pub fn num_total_bins(&self) -> u64 {
        *self.group_bin_boundaries_.last().unwrap_or(&0)
    }

    /// Inner index of a real feature, or -1 when the feature is trivial
    pub fn inner_feature_index(&self, real_fidx: usize) -> i32 {
        self.used_feature_map_[real_fidx]
    }

    /// Real index of an inner feature
    pub fn real_feature_index(&self, inner_fidx: usize) -> i32 {
        self.real_feature_idx_[inner_fidx]
    }

    /// Bin mapper of an inner feature
    pub fn feature_bin_mapper(&self, inner_fidx: usize) -> &BinMapper {
        let group = self.feature2group_[inner_fidx] as usize;
        let sub = self.feature2subfeature_[inner_fidx] as usize;
        self.feature_groups_[group].bin_mapper(sub)
    }

    /// Group of an inner feature
    pub fn feature_group_index(&self, inner_fidx: usize) -> i32 {
        self.feature2group_[inner_fidx]
    }

    /// Sub-feature position of an inner feature inside its group
    pub fn feature_sub_index(&self, inner_fidx: usize) -> i32 {
        self.feature2subfeature_[inner_fidx]
    }

    /// Feature groups
    pub fn feature_groups(&self) -> &[FeatureGroup] {
        &self.feature_groups_
    }

    /// Prefix bin boundaries per group, length `num_groups + 1`
    pub fn group_bin_boundaries(&self) -> &[u64] {
        &self.group_bin_boundaries_
    }

    /// First inner feature of each group
    pub fn group_feature_start(&self) -> &[i32] {
        &self.group_feature_start_
    }

    /// Inner feature count of each group
    pub fn group_feature_cnt(&self) -> &[i32] {
        &self.group_feature_cnt_
    }

    /// Inner features whose default bin differs from the most-frequent bin
    pub fn feature_need_push_zeros(&self) -> &[i32] {
        &self.feature_need_push_zeros_
    }

    /// Per-feature monotone constraints; empty means unconstrained
    pub fn monotone_types(&self) -> &[i8] {
        &self.monotone_types_
    }

    /// Per-feature split-gain multipliers; empty means all 1.0
    pub fn feature_penalty(&self) -> &[f64] {
        &self.feature_penalty_
    }

    /// Per-feature bin caps; empty means unconstrained
    pub fn max_bin_by_feature(&self) -> &[i32] {
        &self.max_bin_by_feature_
    }

    /// Forced bin bounds per total feature
    pub fn forced_bin_bounds(&self) -> &[Vec<f64>] {
        &self.forced_bin_bounds_
    }

    /// Feature names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names_
    }

    /// Set feature names; length must match the total feature count.
    pub fn set_feature_names(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() != self.num_total_features_ {
            return Err(DatasetError::dimension_mismatch(
                self.num_total_features_.to_string(),
                names.len().to_string(),
            ));
        }
        self.feature_names_ = names;
        Ok(())
    }

    /// Whether loading has finished
    pub fn is_finish_load(&self) -> bool {
        self.is_finish_load_
    }

    /// Per-row metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata_
    }

    /// Mutable per-row metadata
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata_
    }

    /// Source data filename
    pub fn data_filename(&self) -> &str {
        &self.data_filename_
    }

    /// Set the source data filename.
    pub fn set_data_filename(&mut self, filename: &str) {
        self.data_filename_ = filename.to_string();
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

fn push_vector<T: Clone>(dest: &mut Vec<T>, src: &[T]) {
    dest.extend_from_slice(src);
}

fn push_offset(dest: &mut Vec<i32>, src: &[i32], offset: i32) {
    dest.extend(src.iter().map(|&v| v + offset));
}

/// Three-way merge of optional per-feature vectors: concatenate when both
/// sides are present, pad the absent side with `default_value` when only one
/// is, and stay empty when both are.
fn push_clear_if_empty<T: Clone + PartialEq>(
    dest: &mut Vec<T>,
    dest_len: usize,
    src: &[T],
    src_len: usize,
    default_value: T,
) {
    if !dest.is_empty() && !src.is_empty() {
        dest.extend_from_slice(src);
    } else if !dest.is_empty() && src.is_empty() {
        for _ in 0..src_len {
            dest.push(default_value.clone());
        }
    } else if dest.is_empty() && !src.is_empty() {
        for _ in 0..dest_len {
            dest.push(default_value.clone());
        }
        dest.extend_from_slice(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_num_data_validates() {
        assert!(Dataset::with_num_data(0).is_err());
        assert!(Dataset::with_num_data(-5).is_err());
        let dataset = Dataset::with_num_data(10).unwrap();
        assert_eq!(dataset.num_data(), 10);
        assert_eq!(dataset.group_bin_boundaries(), &[0]);
    }

    #[test]
    fn test_push_clear_if_empty_three_way() {
        // both present: concatenate
        let mut dest = vec![1i32, 2];
        push_clear_if_empty(&mut dest, 2, &[3, 4], 2, -1);
        assert_eq!(dest, vec![1, 2, 3, 4]);
        // only dest present: pad src side with defaults
        let mut dest = vec![1i32];
        push_clear_if_empty(&mut dest, 1, &[], 3, -1);
        assert_eq!(dest, vec![1, -1, -1, -1]);
        // only src present: pad dest side with defaults
        let mut dest: Vec<i32> = Vec::new();
        push_clear_if_empty(&mut dest, 2, &[7], 1, -1);
        assert_eq!(dest, vec![-1, -1, 7]);
        // both empty: stay empty
        let mut dest: Vec<i32> = Vec::new();
        push_clear_if_empty(&mut dest, 2, &[], 1, -1);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_unknown_field_names_not_handled() {
        let mut dataset = Dataset::with_num_data(4).unwrap();
        assert!(!dataset.set_float_field("unknown", &[0.0; 4]).unwrap());
        assert!(dataset.get_float_field("unknown").is_none());
        assert!(dataset.get_int8_field("nope").is_none());
    }

    #[test]
    fn test_field_name_aliases() {
        let mut dataset = Dataset::with_num_data(2).unwrap();
        assert!(dataset.set_float_field("target", &[1.0, 0.0]).unwrap());
        assert_eq!(dataset.get_float_field("label").unwrap(), &[1.0, 0.0]);
        assert!(dataset.set_int_field("group", &[2]).unwrap());
        assert_eq!(dataset.get_int_field("query").unwrap(), &[0, 2]);
    }
}
