//! Histogram construction tests: dense and multi-valued paths, subset
//! gathering, constant-hessian scaling, and most-frequent-bin repair.

use lightgbm_dataset::{BinMapper, Dataset, DatasetConfig, HistT, MissingType};

fn mapper(num_bin: usize, most_freq_bin: u32, sparse_rate: f64) -> Option<BinMapper> {
    let mut bounds: Vec<f64> = (0..num_bin - 1).map(|i| i as f64 + 0.5).collect();
    bounds.push(f64::INFINITY);
    Some(BinMapper::from_upper_bounds(bounds, MissingType::None, most_freq_bin, sparse_rate).unwrap())
}

/// Build a loaded dataset from a dense row-major value matrix.
fn build_dataset(
    values: &[Vec<f64>],
    mappers: Vec<Option<BinMapper>>,
    total_sample_cnt: i32,
    config: &DatasetConfig,
) -> Dataset {
    let num_data = values.len() as i32;
    let num_features = mappers.len();
    let mut mappers = mappers;
    // sample matrix: the non-zero entries of each column
    let mut row_sets: Vec<Vec<i32>> = vec![Vec::new(); num_features];
    let mut value_sets: Vec<Vec<f64>> = vec![Vec::new(); num_features];
    for (row, row_values) in values.iter().enumerate() {
        for f in 0..num_features {
            if row_values[f] != 0.0 {
                row_sets[f].push(row as i32);
                value_sets[f].push(row_values[f]);
            }
        }
    }
    let sample_rows: Vec<&[i32]> = row_sets.iter().map(|r| r.as_slice()).collect();
    let sample_vals: Vec<&[f64]> = value_sets.iter().map(|v| v.as_slice()).collect();
    let num_per_col: Vec<i32> = row_sets.iter().map(|r| r.len() as i32).collect();

    let mut dataset = Dataset::with_num_data(num_data).unwrap();
    dataset
        .construct(
            &mut mappers,
            Vec::new(),
            &sample_rows,
            &sample_vals,
            &num_per_col,
            total_sample_cnt,
            config,
        )
        .unwrap();
    for (row, row_values) in values.iter().enumerate() {
        dataset.push_one_row(0, row as i32, row_values).unwrap();
    }
    dataset.finish_load();
    dataset
}

/// Naive reference: accumulate (g, h) per slot directly from raw values.
fn naive_histogram(
    dataset: &Dataset,
    values: &[Vec<f64>],
    rows: &[usize],
    gradients: &[f32],
    hessians: &[f32],
) -> Vec<HistT> {
    let mut expected = vec![0.0; 2 * dataset.num_total_bins() as usize];
    for (pos, &row) in rows.iter().enumerate() {
        for inner in 0..dataset.num_features() {
            let real = dataset.real_feature_index(inner) as usize;
            let mapper = dataset.feature_bin_mapper(inner);
            let bin = mapper.value_to_bin(values[row][real]);
            if bin == mapper.most_freq_bin() {
                continue;
            }
            let group = dataset.feature_group_index(inner) as usize;
            let sub = dataset.feature_sub_index(inner) as usize;
            let offsets = dataset.feature_groups()[group].bin_offsets();
            let adjusted = if mapper.most_freq_bin() == 0 { bin - 1 } else { bin };
            let slot = dataset.group_bin_boundaries()[group] as usize
                + (offsets[sub] + adjusted) as usize;
            expected[2 * slot] += gradients[pos] as HistT;
            expected[2 * slot + 1] += hessians[pos] as HistT;
        }
    }
    expected
}

fn run_histograms(
    dataset: &Dataset,
    data_indices: Option<&[i32]>,
    num_data: i32,
    gradients: &[f32],
    hessians: &[f32],
    is_constant_hessian: bool,
) -> Vec<HistT> {
    let mut hist = vec![0.0; 2 * dataset.num_total_bins() as usize];
    let mut ordered_g = vec![0.0f32; dataset.num_data() as usize];
    let mut ordered_h = vec![0.0f32; dataset.num_data() as usize];
    let is_feature_used = vec![true; dataset.num_features()];
    dataset.construct_histograms(
        &is_feature_used,
        data_indices,
        num_data,
        0,
        gradients,
        hessians,
        &mut ordered_g,
        &mut ordered_h,
        is_constant_hessian,
        &mut hist,
    );
    hist
}

fn assert_hist_eq(actual: &[HistT], expected: &[HistT], skip_slots: &[usize]) {
    assert_eq!(actual.len(), expected.len());
    for (slot, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        if skip_slots.contains(&(slot / 2)) {
            continue;
        }
        assert!(
            (a - e).abs() < 1e-9,
            "slot {} mismatch: {} vs {}",
            slot,
            a,
            e
        );
    }
}

/// One feature, bins [0,1,0,2,1,0,2,1], unit gradients, constant hessian:
/// per-bin totals are (3,3) for bin 1 and (2,2) for bin 2.
#[test]
fn test_single_feature_histogram_counts() {
    let bins = [0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 2.0, 1.0];
    let values: Vec<Vec<f64>> = bins.iter().map(|&b| vec![b]).collect();
    let dataset = build_dataset(&values, vec![mapper(3, 0, 0.4)], 8, &DatasetConfig::default());
    assert_eq!(dataset.num_groups(), 1);
    // layout: slot 0 implicit, bin 1 -> slot 1, bin 2 -> slot 2
    assert_eq!(dataset.num_total_bins(), 3);

    let gradients = vec![1.0f32; 8];
    let hessians = vec![1.0f32; 8];
    let hist = run_histograms(&dataset, None, 8, &gradients, &hessians, true);
    assert_eq!(hist[2], 3.0);
    assert_eq!(hist[3], 3.0);
    assert_eq!(hist[4], 2.0);
    assert_eq!(hist[5], 2.0);
}

/// With a non-zero most-frequent bin, fix_histogram restores the omitted
/// bin so that per-bin sums reproduce the leaf totals.
#[test]
fn test_fix_histogram_restores_most_freq_bin() {
    let bins = [0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 2.0, 1.0];
    let values: Vec<Vec<f64>> = bins.iter().map(|&b| vec![b]).collect();
    // most frequent bin is 1: its three rows are omitted from storage
    let dataset = build_dataset(&values, vec![mapper(3, 1, 0.4)], 8, &DatasetConfig::default());
    let gradients = vec![1.0f32; 8];
    let hessians = vec![1.0f32; 8];
    let hist = run_histograms(&dataset, None, 8, &gradients, &hessians, true);

    // feature-level histogram indexed by raw bin: bins 0..=2 sit at slots
    // 1..=3 because most_freq_bin != 0
    let mut feature_hist = vec![0.0; 2 * 3];
    for bin in 0..3usize {
        feature_hist[2 * bin] = hist[2 * (1 + bin)];
        feature_hist[2 * bin + 1] = hist[2 * (1 + bin) + 1];
    }
    assert_eq!(feature_hist[0], 3.0); // bin 0
    assert_eq!(feature_hist[2], 0.0); // bin 1 omitted during construction
    assert_eq!(feature_hist[4], 2.0); // bin 2

    dataset.fix_histogram(0, 8.0, 8.0, &mut feature_hist);
    assert_eq!(feature_hist[2], 3.0);
    assert_eq!(feature_hist[3], 3.0);
    let total_grad: HistT = (0..3).map(|b| feature_hist[2 * b]).sum();
    let total_hess: HistT = (0..3).map(|b| feature_hist[2 * b + 1]).sum();
    assert_eq!(total_grad, 8.0);
    assert_eq!(total_hess, 8.0);
}

/// fix_histogram leaves histograms alone when the most-frequent bin is 0.
#[test]
fn test_fix_histogram_noop_for_zero_most_freq_bin() {
    let values: Vec<Vec<f64>> = vec![vec![1.0], vec![2.0], vec![0.0]];
    let dataset = build_dataset(&values, vec![mapper(3, 0, 0.4)], 3, &DatasetConfig::default());
    let mut feature_hist = vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
    let before = feature_hist.clone();
    dataset.fix_histogram(0, 2.0, 2.0, &mut feature_hist);
    assert_eq!(feature_hist, before);
}

/// Dense-path histograms match a naive per-row accumulation.
#[test]
fn test_dense_histogram_matches_naive() {
    let values: Vec<Vec<f64>> = (0..40)
        .map(|i| {
            vec![
                (i % 4) as f64,
                ((i * 7) % 5) as f64,
                if i % 3 == 0 { (i % 2 + 1) as f64 } else { 0.0 },
            ]
        })
        .collect();
    let mappers = vec![mapper(4, 0, 0.2), mapper(5, 0, 0.2), mapper(3, 0, 0.7)];
    let config = DatasetConfig {
        enable_bundle: false,
        ..Default::default()
    };
    let dataset = build_dataset(&values, mappers, 40, &config);

    let gradients: Vec<f32> = (0..40).map(|i| (i as f32 * 0.25) - 3.0).collect();
    let hessians: Vec<f32> = (0..40).map(|i| 0.5 + (i % 5) as f32 * 0.1).collect();
    let hist = run_histograms(&dataset, None, 40, &gradients, &hessians, false);
    let rows: Vec<usize> = (0..40).collect();
    let expected = naive_histogram(&dataset, &values, &rows, &gradients, &hessians);
    // slot 0 of each group collects the implicit rows; the naive reference
    // does not model it
    let implicit: Vec<usize> = dataset
        .group_bin_boundaries()
        .iter()
        .take(dataset.num_groups())
        .map(|&b| b as usize)
        .collect();
    assert_hist_eq(&hist, &expected, &implicit);
}

/// The row-subset path gathers statistics and matches the naive reference
/// on the selected rows only.
#[test]
fn test_subset_histogram_matches_naive() {
    let values: Vec<Vec<f64>> = (0..30)
        .map(|i| vec![(i % 3) as f64, ((i / 3) % 4) as f64])
        .collect();
    let mappers = vec![mapper(3, 0, 0.2), mapper(4, 0, 0.2)];
    let config = DatasetConfig {
        enable_bundle: false,
        ..Default::default()
    };
    let dataset = build_dataset(&values, mappers, 30, &config);

    let gradients: Vec<f32> = (0..30).map(|i| 1.0 + (i % 7) as f32).collect();
    let hessians: Vec<f32> = (0..30).map(|i| 1.0 + (i % 3) as f32 * 0.5).collect();
    let indices: Vec<i32> = (0..30).step_by(2).collect();
    let hist = run_histograms(&dataset, Some(&indices), 15, &gradients, &hessians, false);

    let rows: Vec<usize> = indices.iter().map(|&i| i as usize).collect();
    let sub_g: Vec<f32> = rows.iter().map(|&r| gradients[r]).collect();
    let sub_h: Vec<f32> = rows.iter().map(|&r| hessians[r]).collect();
    let expected = naive_histogram(&dataset, &values, &rows, &sub_g, &sub_h);
    let implicit: Vec<usize> = dataset
        .group_bin_boundaries()
        .iter()
        .take(dataset.num_groups())
        .map(|&b| b as usize)
        .collect();
    assert_hist_eq(&hist, &expected, &implicit);
}

/// A full-coverage subset (indices == 0..N) must equal the no-subset path.
#[test]
fn test_full_subset_equals_no_subset() {
    let values: Vec<Vec<f64>> = (0..20).map(|i| vec![(i % 4) as f64]).collect();
    let dataset = build_dataset(&values, vec![mapper(4, 0, 0.2)], 20, &DatasetConfig::default());
    let gradients: Vec<f32> = (0..20).map(|i| i as f32 * 0.5).collect();
    let hessians: Vec<f32> = (0..20).map(|i| 1.0 + (i % 2) as f32).collect();
    let indices: Vec<i32> = (0..20).collect();

    let plain = run_histograms(&dataset, None, 20, &gradients, &hessians, false);
    let subset = run_histograms(&dataset, Some(&indices), 20, &gradients, &hessians, false);
    assert_eq!(plain, subset);
}

/// Multi-valued groups run the chunk-and-merge path and still match the
/// naive reference outside the implicit bin.
#[test]
fn test_multi_val_histogram_matches_naive() {
    // two overlapping sparse features that bundle into a multi-val group
    let values: Vec<Vec<f64>> = (0..60)
        .map(|i| {
            vec![
                if i < 40 { (i % 2 + 1) as f64 } else { 0.0 },
                if i >= 20 { (i % 2 + 1) as f64 } else { 0.0 },
            ]
        })
        .collect();
    let mappers = vec![mapper(3, 0, 0.5), mapper(3, 0, 0.5)];
    // sample statistics that force a pass-2 merge with conflicts
    let row_a: Vec<i32> = (0..3000).collect();
    let row_b: Vec<i32> = (2000..5000).collect();
    let val_a = vec![1.0; 3000];
    let val_b = vec![1.0; 3000];
    let mut mappers = mappers;
    let mut dataset = Dataset::with_num_data(60).unwrap();
    dataset
        .construct(
            &mut mappers,
            Vec::new(),
            &[&row_a, &row_b],
            &[&val_a, &val_b],
            &[3000, 3000],
            10_000,
            &DatasetConfig::default(),
        )
        .unwrap();
    assert!(dataset.feature_groups()[0].is_multi_val());
    for (row, row_values) in values.iter().enumerate() {
        dataset.push_one_row(0, row as i32, row_values).unwrap();
    }
    dataset.finish_load();

    let gradients: Vec<f32> = (0..60).map(|i| (i as f32).sin()).collect();
    let hessians: Vec<f32> = (0..60).map(|i| 1.0 + (i % 4) as f32 * 0.25).collect();
    let hist = run_histograms(&dataset, None, 60, &gradients, &hessians, false);
    let rows: Vec<usize> = (0..60).collect();
    let expected = naive_histogram(&dataset, &values, &rows, &gradients, &hessians);
    assert_hist_eq(&hist, &expected, &[0]);
}

/// Constant hessian scales every hessian slot by hessians[0]; zero yields
/// all-zero hessians.
#[test]
fn test_constant_hessian_scaling() {
    let values: Vec<Vec<f64>> = (0..10).map(|i| vec![(i % 3) as f64]).collect();
    let dataset = build_dataset(&values, vec![mapper(3, 0, 0.3)], 10, &DatasetConfig::default());
    let gradients = vec![1.0f32; 10];

    let hessians = vec![0.5f32; 10];
    let hist = run_histograms(&dataset, None, 10, &gradients, &hessians, true);
    for slot in 1..dataset.num_total_bins() as usize {
        // every populated bin holds count * 0.5 in its hessian slot
        let count = hist[2 * slot];
        assert!((hist[2 * slot + 1] - count * 0.5).abs() < 1e-12);
    }

    let zero_hessians = vec![0.0f32; 10];
    let hist = run_histograms(&dataset, None, 10, &gradients, &zero_hessians, true);
    for slot in 0..dataset.num_total_bins() as usize {
        assert_eq!(hist[2 * slot + 1], 0.0);
    }
}

/// num_data == 0 produces an all-zero buffer for used groups.
#[test]
fn test_zero_rows_yield_zero_histogram() {
    let values: Vec<Vec<f64>> = (0..10).map(|i| vec![(i % 3) as f64]).collect();
    let dataset = build_dataset(&values, vec![mapper(3, 0, 0.3)], 10, &DatasetConfig::default());
    let gradients = vec![1.0f32; 10];
    let hessians = vec![1.0f32; 10];
    let mut hist = vec![5.0; 2 * dataset.num_total_bins() as usize];
    let mut ordered_g = vec![0.0f32; 10];
    let mut ordered_h = vec![0.0f32; 10];
    dataset.construct_histograms(
        &[true],
        None,
        0,
        0,
        &gradients,
        &hessians,
        &mut ordered_g,
        &mut ordered_h,
        false,
        &mut hist,
    );
    assert!(hist.iter().all(|&v| v == 0.0));
}

/// Negative leaf index is a silent no-op.
#[test]
fn test_negative_leaf_idx_is_noop() {
    let values: Vec<Vec<f64>> = (0..4).map(|i| vec![(i % 3) as f64]).collect();
    let dataset = build_dataset(&values, vec![mapper(3, 0, 0.3)], 4, &DatasetConfig::default());
    let gradients = vec![1.0f32; 4];
    let hessians = vec![1.0f32; 4];
    let mut hist = vec![7.0; 2 * dataset.num_total_bins() as usize];
    let mut ordered_g = vec![0.0f32; 4];
    let mut ordered_h = vec![0.0f32; 4];
    dataset.construct_histograms(
        &[true],
        None,
        4,
        -1,
        &gradients,
        &hessians,
        &mut ordered_g,
        &mut ordered_h,
        false,
        &mut hist,
    );
    assert!(hist.iter().all(|&v| v == 7.0));
}

/// Unused features leave their groups untouched.
#[test]
fn test_unused_group_not_written() {
    let values: Vec<Vec<f64>> = (0..12)
        .map(|i| vec![(i % 3) as f64, ((i + 1) % 4) as f64])
        .collect();
    let config = DatasetConfig {
        enable_bundle: false,
        ..Default::default()
    };
    let dataset = build_dataset(&values, vec![mapper(3, 0, 0.2), mapper(4, 0, 0.2)], 12, &config);
    assert_eq!(dataset.num_groups(), 2);

    let gradients = vec![1.0f32; 12];
    let hessians = vec![1.0f32; 12];
    let mut hist = vec![9.0; 2 * dataset.num_total_bins() as usize];
    let mut ordered_g = vec![0.0f32; 12];
    let mut ordered_h = vec![0.0f32; 12];
    dataset.construct_histograms(
        &[true, false],
        None,
        12,
        0,
        &gradients,
        &hessians,
        &mut ordered_g,
        &mut ordered_h,
        false,
        &mut hist,
    );
    let boundary = 2 * dataset.group_bin_boundaries()[1] as usize;
    assert!(hist[..boundary].iter().any(|&v| v != 9.0));
    assert!(hist[boundary..].iter().all(|&v| v == 9.0));
}
