//! Exclusive feature bundling.
//!
//! Packs mutually-near-exclusive sparse features into shared groups so the
//! binned matrix stays small and histogram construction touches fewer
//! columns. Group formation runs in two passes: a strict single-valued pass
//! where at most one bundled feature may be non-default per row, then a
//! relaxed multi-valued pass for everything the first pass could not place
//! densely. The driver tries two feature orderings and keeps whichever
//! produces fewer groups.
//!
//! All randomness flows through [`Random`] seeded with the training row
//! count, so a fixed input always yields the same grouping.

use crate::core::meta::DataSizeT;
use crate::core::utils::Random;
use crate::io::bin::BinMapper;

const MAX_SEARCH_GROUP: usize = 100;
const MAX_BIN_PER_GROUP: i32 = 256;
const DENSE_THRESHOLD: f64 = 0.6;
const MAX_CONCURRENT_FEATURE_PER_GROUP: u16 = 64;
const MAX_BIN_PER_MULTI_VAL_GROUP: i32 = 1 << 14;

/// Per-feature non-zero sample rows: either the caller's slice or a fixup
/// list synthesized for features whose default bin differs from the
/// most-frequent bin. The caller never observes the replacement.
#[derive(Debug)]
pub enum FeatureSample<'a> {
    /// The caller's non-zero row list
    Borrowed(&'a [DataSizeT]),
    /// Synthesized non-most-frequent row list
    Fixed(Vec<DataSizeT>),
}

impl<'a> FeatureSample<'a> {
    fn rows(&self) -> &[DataSizeT] {
        match self {
            FeatureSample::Borrowed(s) => s,
            FeatureSample::Fixed(v) => v,
        }
    }
}

/// One feature per group; the fallback when bundling is disabled.
pub fn no_group(used_features: &[usize]) -> Vec<Vec<usize>> {
    used_features.iter().map(|&f| vec![f]).collect()
}

fn mapper_of<'a>(bin_mappers: &'a [Option<BinMapper>], fidx: usize) -> &'a BinMapper {
    bin_mappers[fidx]
        .as_ref()
        .expect("used feature must have a bin mapper")
}

/// Bin budget delta of adding `fidx` to a group.
fn delta_bin(bin_mappers: &[Option<BinMapper>], fidx: usize) -> i32 {
    let mapper = mapper_of(bin_mappers, fidx);
    mapper.num_bin() + if mapper.default_bin() == 0 { -1 } else { 0 }
}

/// Count rows of `indices` already marked in `mark`.
///
/// Returns `-1` as soon as the running count reaches `max_cnt` or any row
/// would exceed `max_feature_cnt` concurrent features.
fn get_conflict_count(
    mark: &[u8],
    indices: &[DataSizeT],
    max_cnt: i64,
    max_feature_cnt: u16,
) -> i64 {
    let mut ret: i64 = 0;
    for &idx in indices {
        let m = mark[idx as usize];
        if m > 0 {
            ret += 1;
            if m as u16 + 1 > max_feature_cnt {
                return -1;
            }
        }
        if ret >= max_cnt {
            return -1;
        }
    }
    ret
}

fn mark_used(mark: &mut [u8], indices: &[DataSizeT]) {
    for &idx in indices {
        mark[idx as usize] += 1;
    }
}

/// Synthesize the non-zero row list of a feature whose default bin differs
/// from its most-frequent bin: drop sampled rows that bin to the
/// most-frequent bin, and emit every row absent from the sample list.
pub fn fix_sample_indices(
    bin_mapper: &BinMapper,
    num_total_samples: DataSizeT,
    sample_indices: &[DataSizeT],
    sample_values: &[f64],
) -> Vec<DataSizeT> {
    let mut ret = Vec::new();
    if bin_mapper.default_bin() == bin_mapper.most_freq_bin() {
        return ret;
    }
    let num_indices = sample_indices.len();
    let mut i: DataSizeT = 0;
    let mut j = 0usize;
    while i < num_total_samples {
        if j < num_indices && sample_indices[j] < i {
            j += 1;
        } else if j < num_indices && sample_indices[j] == i {
            if bin_mapper.value_to_bin(sample_values[j]) != bin_mapper.most_freq_bin() {
                ret.push(i);
            }
            i += 1;
        } else {
            ret.push(i);
            i += 1;
        }
    }
    ret
}

struct GroupState {
    features_in_group: Vec<Vec<usize>>,
    conflict_marks: Vec<Vec<u8>>,
    group_used_row_cnt: Vec<i64>,
    group_total_data_cnt: Vec<i64>,
    group_num_bin: Vec<i32>,
}

impl GroupState {
    fn new() -> Self {
        GroupState {
            features_in_group: Vec::new(),
            conflict_marks: Vec::new(),
            group_used_row_cnt: Vec::new(),
            group_total_data_cnt: Vec::new(),
            group_num_bin: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.features_in_group.len()
    }

    fn open_group(
        &mut self,
        fidx: usize,
        non_zero_cnt: i64,
        delta_bin: i32,
        rows: Option<&[DataSizeT]>,
        total_sample_cnt: i64,
    ) {
        self.features_in_group.push(vec![fidx]);
        self.conflict_marks.push(vec![0u8; total_sample_cnt as usize]);
        if let Some(rows) = rows {
            mark_used(self.conflict_marks.last_mut().unwrap(), rows);
        }
        self.group_total_data_cnt.push(non_zero_cnt);
        self.group_used_row_cnt.push(non_zero_cnt);
        self.group_num_bin.push(1 + delta_bin);
    }

    fn add_to_group(
        &mut self,
        gid: usize,
        fidx: usize,
        non_zero_cnt: i64,
        conflict_cnt: i64,
        delta_bin: i32,
        rows: Option<&[DataSizeT]>,
    ) {
        self.features_in_group[gid].push(fidx);
        self.group_total_data_cnt[gid] += non_zero_cnt;
        self.group_used_row_cnt[gid] += non_zero_cnt - conflict_cnt;
        if let Some(rows) = rows {
            mark_used(&mut self.conflict_marks[gid], rows);
        }
        self.group_num_bin[gid] += delta_bin;
    }
}

/// Pick at most `MAX_SEARCH_GROUP` candidates: always the most recently
/// created one, plus a uniform random sample of the rest.
fn select_search_groups(available_groups: &[usize], rand: &mut Random) -> Vec<usize> {
    let mut search_groups = Vec::new();
    if !available_groups.is_empty() {
        let last = available_groups.len() - 1;
        let indices = rand.sample(last as i32, last.min(MAX_SEARCH_GROUP - 1) as i32);
        search_groups.push(*available_groups.last().unwrap());
        for idx in indices {
            search_groups.push(available_groups[idx as usize]);
        }
    }
    search_groups
}

/// Two-pass group formation over `find_order`.
///
/// Returns the feature lists per group and a parallel flag vector marking
/// multi-valued groups.
#[allow(clippy::too_many_arguments)]
pub fn find_groups(
    bin_mappers: &[Option<BinMapper>],
    find_order: &[usize],
    sample_indices: &[FeatureSample<'_>],
    num_per_col: &[DataSizeT],
    num_sample_col: usize,
    total_sample_cnt: DataSizeT,
    num_data: DataSizeT,
    is_use_gpu: bool,
) -> (Vec<Vec<usize>>, Vec<bool>) {
    let total_sample_cnt = total_sample_cnt as i64;
    let single_val_max_conflict_cnt = total_sample_cnt / 10000;
    let max_samples_per_multi_val_group = total_sample_cnt * 10;

    let mut rand = Random::with_seed(num_data);
    let mut state = GroupState::new();

    // first round: fill the single val groups
    for &fidx in find_order {
        let is_filtered_feature = fidx >= num_sample_col;
        let cur_non_zero_cnt: i64 = if is_filtered_feature {
            0
        } else {
            num_per_col[fidx] as i64
        };
        let d_bin = delta_bin(bin_mappers, fidx);
        let mut available_groups = Vec::new();
        for gid in 0..state.len() {
            let cur_num_bin = state.group_num_bin[gid] + d_bin;
            if state.group_total_data_cnt[gid] + cur_non_zero_cnt
                <= total_sample_cnt + single_val_max_conflict_cnt
                && (!is_use_gpu || cur_num_bin <= MAX_BIN_PER_GROUP)
            {
                available_groups.push(gid);
            }
        }
        let search_groups = select_search_groups(&available_groups, &mut rand);
        let mut best_gid: Option<usize> = None;
        let mut best_conflict_cnt: i64 = -1;
        for gid in search_groups {
            let rest_max_cnt = single_val_max_conflict_cnt - state.group_total_data_cnt[gid]
                + state.group_used_row_cnt[gid];
            let cnt = if is_filtered_feature {
                0
            } else {
                get_conflict_count(
                    &state.conflict_marks[gid],
                    sample_indices[fidx].rows(),
                    rest_max_cnt,
                    1,
                )
            };
            if cnt >= 0 && cnt <= rest_max_cnt && cnt <= cur_non_zero_cnt / 2 {
                best_gid = Some(gid);
                best_conflict_cnt = cnt;
                break;
            }
        }
        let rows = if is_filtered_feature {
            None
        } else {
            Some(sample_indices[fidx].rows())
        };
        match best_gid {
            Some(gid) => {
                state.add_to_group(gid, fidx, cur_non_zero_cnt, best_conflict_cnt, d_bin, rows);
            }
            None => state.open_group(fidx, cur_non_zero_cnt, d_bin, rows, total_sample_cnt),
        }
    }

    // split: keep dense pass-1 groups as forced single val, dissolve the rest
    let mut second_round_features = Vec::new();
    let mut kept = GroupState::new();
    let mut forced_single_val_group = Vec::new();
    let pass1_groups = state;
    for gid in 0..pass1_groups.features_in_group.len() {
        let dense_rate =
            pass1_groups.group_used_row_cnt[gid] as f64 / total_sample_cnt as f64;
        if dense_rate >= DENSE_THRESHOLD {
            kept.features_in_group
                .push(pass1_groups.features_in_group[gid].clone());
            kept.conflict_marks
                .push(pass1_groups.conflict_marks[gid].clone());
            kept.group_used_row_cnt
                .push(pass1_groups.group_used_row_cnt[gid]);
            kept.group_total_data_cnt
                .push(pass1_groups.group_total_data_cnt[gid]);
            kept.group_num_bin.push(pass1_groups.group_num_bin[gid]);
            forced_single_val_group.push(true);
        } else {
            for &fidx in &pass1_groups.features_in_group[gid] {
                second_round_features.push(fidx);
            }
        }
    }
    let mut state = kept;
    let mut multi_val_group = vec![false; state.len()];

    // second round: fill the multi-val groups
    for &fidx in &second_round_features {
        let is_filtered_feature = fidx >= num_sample_col;
        let cur_non_zero_cnt: i64 = if is_filtered_feature {
            0
        } else {
            num_per_col[fidx] as i64
        };
        let d_bin = delta_bin(bin_mappers, fidx);
        let mut available_groups = Vec::new();
        for gid in 0..state.len() {
            let cur_num_bin = state.group_num_bin[gid] + d_bin;
            if multi_val_group[gid] && cur_num_bin > MAX_BIN_PER_MULTI_VAL_GROUP {
                continue;
            }
            let max_sample_cnt = if forced_single_val_group[gid] {
                total_sample_cnt + single_val_max_conflict_cnt
            } else {
                max_samples_per_multi_val_group
            };
            if state.group_total_data_cnt[gid] + cur_non_zero_cnt <= max_sample_cnt
                && (!is_use_gpu || cur_num_bin <= MAX_BIN_PER_GROUP)
            {
                available_groups.push(gid);
            }
        }
        let search_groups = select_search_groups(&available_groups, &mut rand);
        let mut best_gid: Option<usize> = None;
        let mut best_conflict_cnt: i64 = total_sample_cnt + 1;
        for gid in search_groups {
            let mut rest_max_cnt = total_sample_cnt;
            if forced_single_val_group[gid] {
                rest_max_cnt = rest_max_cnt.min(
                    single_val_max_conflict_cnt - state.group_total_data_cnt[gid]
                        + state.group_used_row_cnt[gid],
                );
            }
            let cnt = if is_filtered_feature {
                0
            } else {
                get_conflict_count(
                    &state.conflict_marks[gid],
                    sample_indices[fidx].rows(),
                    rest_max_cnt,
                    MAX_CONCURRENT_FEATURE_PER_GROUP,
                )
            };
            if cnt < 0 {
                continue;
            }
            // the first valid candidate always wins; total_data_cnt breaks
            // ties only against an already-selected candidate
            let better = match best_gid {
                None => true,
                Some(best) => {
                    cnt < best_conflict_cnt
                        || (cnt == best_conflict_cnt
                            && (forced_single_val_group[gid]
                                || state.group_total_data_cnt[best]
                                    > state.group_total_data_cnt[gid]))
                }
            };
            if better {
                best_conflict_cnt = cnt;
                best_gid = Some(gid);
            }
            if cnt == 0 && forced_single_val_group[gid] {
                break;
            }
        }
        let rows = if is_filtered_feature {
            None
        } else {
            Some(sample_indices[fidx].rows())
        };
        match best_gid {
            Some(gid) => {
                state.add_to_group(gid, fidx, cur_non_zero_cnt, best_conflict_cnt, d_bin, rows);
                if !multi_val_group[gid]
                    && state.group_total_data_cnt[gid] - state.group_used_row_cnt[gid]
                        > single_val_max_conflict_cnt
                {
                    multi_val_group[gid] = true;
                }
            }
            None => {
                forced_single_val_group.push(false);
                multi_val_group.push(false);
                state.open_group(fidx, cur_non_zero_cnt, d_bin, rows, total_sample_cnt);
            }
        }
    }
    (state.features_in_group, multi_val_group)
}

/// Bundling driver: runs [`find_groups`] on the caller's feature order and
/// on a densest-first order, keeps the layout with fewer groups, then
/// applies a deterministic shuffle.
#[allow(clippy::too_many_arguments)]
pub fn fast_feature_bundling(
    bin_mappers: &[Option<BinMapper>],
    sample_indices: &[&[DataSizeT]],
    sample_values: &[&[f64]],
    num_per_col: &[DataSizeT],
    num_sample_col: usize,
    total_sample_cnt: DataSizeT,
    used_features: &[usize],
    num_data: DataSizeT,
    is_use_gpu: bool,
) -> (Vec<Vec<usize>>, Vec<bool>) {
    // put dense features first
    let feature_non_zero_cnt: Vec<i64> = used_features
        .iter()
        .map(|&fidx| {
            if fidx < num_sample_col {
                num_per_col[fidx] as i64
            } else {
                0
            }
        })
        .collect();
    let mut sorted_idx: Vec<usize> = (0..used_features.len()).collect();
    sorted_idx.sort_by(|&a, &b| feature_non_zero_cnt[b].cmp(&feature_non_zero_cnt[a]));
    let feature_order_by_cnt: Vec<usize> =
        sorted_idx.iter().map(|&sidx| used_features[sidx]).collect();

    // replace sample views of features whose default bin differs from the
    // most-frequent bin; the fixup lists live only for this call
    let mut views: Vec<FeatureSample<'_>> = sample_indices
        .iter()
        .map(|&s| FeatureSample::Borrowed(s))
        .collect();
    let mut tmp_num_per_col = vec![0 as DataSizeT; num_sample_col];
    for &fidx in used_features {
        if fidx >= num_sample_col {
            continue;
        }
        let fixed = fix_sample_indices(
            mapper_of(bin_mappers, fidx),
            total_sample_cnt,
            sample_indices[fidx],
            sample_values[fidx],
        );
        if !fixed.is_empty() {
            tmp_num_per_col[fidx] = fixed.len() as DataSizeT;
            views[fidx] = FeatureSample::Fixed(fixed);
        } else {
            tmp_num_per_col[fidx] = num_per_col[fidx];
        }
    }

    let (mut features_in_group, mut group_is_multi_val) = find_groups(
        bin_mappers,
        used_features,
        &views,
        &tmp_num_per_col,
        num_sample_col,
        total_sample_cnt,
        num_data,
        is_use_gpu,
    );
    let (group2, group_is_multi_val2) = find_groups(
        bin_mappers,
        &feature_order_by_cnt,
        &views,
        &tmp_num_per_col,
        num_sample_col,
        total_sample_cnt,
        num_data,
        is_use_gpu,
    );
    if features_in_group.len() > group2.len() {
        features_in_group = group2;
        group_is_multi_val = group_is_multi_val2;
    }

    // shuffle groups; the flag vector must swap in lock-step with the lists
    let num_group = features_in_group.len() as i32;
    let mut tmp_rand = Random::with_seed(num_data);
    for i in 0..(num_group - 1).max(0) {
        let j = tmp_rand.next_short(i + 1, num_group);
        features_in_group.swap(i as usize, j as usize);
        group_is_multi_val.swap(i as usize, j as usize);
    }
    (features_in_group, group_is_multi_val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::bin::MissingType;

    fn mapper(num_bin: usize, most_freq_bin: u32, sparse_rate: f64) -> Option<BinMapper> {
        let mut bounds: Vec<f64> = (0..num_bin - 1).map(|i| i as f64 + 0.5).collect();
        bounds.push(f64::INFINITY);
        Some(
            BinMapper::from_upper_bounds(bounds, MissingType::None, most_freq_bin, sparse_rate)
                .unwrap(),
        )
    }

    #[test]
    fn test_no_group() {
        let groups = no_group(&[0, 2, 5]);
        assert_eq!(groups, vec![vec![0], vec![2], vec![5]]);
    }

    #[test]
    fn test_get_conflict_count_counts_marked_rows() {
        let mut mark = vec![0u8; 10];
        mark[2] = 1;
        mark[4] = 1;
        let cnt = get_conflict_count(&mark, &[1, 2, 3], 10, 2);
        assert_eq!(cnt, 1);
    }

    #[test]
    fn test_get_conflict_count_aborts_on_budget() {
        let mut mark = vec![0u8; 10];
        mark[1] = 1;
        assert_eq!(get_conflict_count(&mark, &[1, 2], 1, 2), -1);
        // a zero budget aborts on the first row, marked or not
        assert_eq!(get_conflict_count(&mark, &[5], 0, 2), -1);
    }

    #[test]
    fn test_get_conflict_count_aborts_on_concurrency() {
        let mut mark = vec![0u8; 4];
        mark[0] = 1;
        assert_eq!(get_conflict_count(&mark, &[0], 10, 1), -1);
        assert_eq!(get_conflict_count(&mark, &[0], 10, 2), 1);
    }

    #[test]
    fn test_fix_sample_indices_noop_when_default_is_most_freq() {
        let m = mapper(3, 0, 0.5).unwrap();
        assert!(fix_sample_indices(&m, 10, &[1, 2], &[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_fix_sample_indices_emits_absent_rows() {
        // most_freq_bin 1 != default_bin 0: implicit-zero rows become
        // non-default, sampled rows at the most-frequent bin drop out
        let m = mapper(3, 1, 0.5).unwrap();
        let fixed = fix_sample_indices(&m, 6, &[1, 3], &[1.0, 2.0]);
        // row 1 bins to 1 == most_freq -> dropped; row 3 bins to 2 -> kept;
        // rows 0, 2, 4, 5 absent from the sample list -> emitted
        assert_eq!(fixed, vec![0, 2, 3, 4, 5]);
    }

    /// Two features with disjoint non-zero rows bundle into one group.
    #[test]
    fn test_exclusive_pair_bundles() {
        let mappers = vec![mapper(3, 0, 0.5), mapper(3, 0, 0.5)];
        let rows_a: Vec<DataSizeT> = (0..50).collect();
        let rows_b: Vec<DataSizeT> = (50..100).collect();
        let vals_a = vec![1.0; 50];
        let vals_b = vec![2.0; 50];
        let (groups, multi) = fast_feature_bundling(
            &mappers,
            &[&rows_a, &rows_b],
            &[&vals_a, &vals_b],
            &[50, 50],
            2,
            100,
            &[0, 1],
            100,
            false,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(multi, vec![false]);
    }

    /// Fully dense conflicting features cannot be bundled.
    #[test]
    fn test_dense_features_stay_separate() {
        let mappers: Vec<_> = (0..4).map(|_| mapper(5, 0, 0.0)).collect();
        let rows: Vec<DataSizeT> = (0..100).collect();
        let vals = vec![1.0; 100];
        let sample_rows: Vec<&[DataSizeT]> = (0..4).map(|_| rows.as_slice()).collect();
        let sample_vals: Vec<&[f64]> = (0..4).map(|_| vals.as_slice()).collect();
        let (groups, multi) = fast_feature_bundling(
            &mappers,
            &sample_rows,
            &sample_vals,
            &[100, 100, 100, 100],
            4,
            100,
            &[0, 1, 2, 3],
            100,
            false,
        );
        assert_eq!(groups.len(), 4);
        assert!(multi.iter().all(|&m| !m));
        let mut all: Vec<usize> = groups.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    /// Same inputs, same seed: identical grouping.
    #[test]
    fn test_bundling_is_deterministic() {
        let mappers: Vec<_> = (0..6).map(|_| mapper(4, 0, 0.5)).collect();
        let row_sets: Vec<Vec<DataSizeT>> = (0..6)
            .map(|f| ((f * 13 % 40)..(f * 13 % 40 + 30) as DataSizeT).collect())
            .collect();
        let vals = vec![1.0; 30];
        let sample_rows: Vec<&[DataSizeT]> = row_sets.iter().map(|r| r.as_slice()).collect();
        let sample_vals: Vec<&[f64]> = (0..6).map(|_| vals.as_slice()).collect();
        let num_per_col = vec![30; 6];
        let used: Vec<usize> = (0..6).collect();

        let run = || {
            fast_feature_bundling(
                &mappers,
                &sample_rows,
                &sample_vals,
                &num_per_col,
                6,
                100,
                &used,
                1000,
                false,
            )
        };
        let (g1, m1) = run();
        let (g2, m2) = run();
        assert_eq!(g1, g2);
        assert_eq!(m1, m2);
    }

    /// Filtered features (beyond the sampled columns) bundle as all-zero.
    #[test]
    fn test_filtered_feature_joins_first_group() {
        let mappers = vec![mapper(3, 0, 0.5), mapper(3, 0, 0.9)];
        let rows: Vec<DataSizeT> = (0..10).collect();
        let vals = vec![1.0; 10];
        let (groups, _) = fast_feature_bundling(
            &mappers,
            &[&rows],
            &[&vals],
            &[10],
            1,
            100,
            &[0, 1],
            100,
            false,
        );
        // feature 1 has no sampled rows, so it conflicts with nothing
        assert_eq!(groups.len(), 1);
    }
}
