//! Integration tests for descriptives, hypothesis tests and standardization.

mod common;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use childlang_stats::data_handling::{Column, Dataset, Factor};
use childlang_stats::descriptive::{describe, describe_by, frequencies, summarize};
use childlang_stats::error::AnalysisError;
use childlang_stats::hypothesis::{
    cohens_d_paired, one_sample_t_test, paired_t_test, pearson_test, welch_t_test,
};
use childlang_stats::preprocessing::{derived_name, standardize_columns};

fn sample(seed: u64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| 10.0 + 3.0 * common::noise(&mut rng)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|v| 0.8 * v + 1.5 + 0.5 * common::noise(&mut rng))
        .collect();
    (x, y)
}

// ---------------------------------------------------------------------------
// Descriptives
// ---------------------------------------------------------------------------

#[test]
fn summary_with_missing_matches_filtered_column() {
    let with_missing = Array1::from_vec(vec![4.0, f64::NAN, 6.0, 8.0, f64::NAN, 2.0]);
    let filtered = Array1::from_vec(vec![4.0, 6.0, 8.0, 2.0]);

    let a = summarize("x", &with_missing);
    let b = summarize("x", &filtered);
    assert_eq!(a.n, 4);
    assert_eq!(a.missing, 2);
    assert_eq!(b.missing, 0);
    assert!((a.mean - b.mean).abs() < 1e-12);
    assert!((a.sd - b.sd).abs() < 1e-12);
    assert_eq!(a.min, 2.0);
    assert_eq!(a.max, 8.0);
}

#[test]
fn describe_reports_unknown_column() {
    let ds = Dataset::from_numeric(vec![("a", vec![1.0, 2.0])]).unwrap();
    assert_eq!(
        describe(&ds, &["b"]).unwrap_err(),
        AnalysisError::UnknownColumn("b".to_string())
    );
}

#[test]
fn frequencies_and_group_summaries() {
    let sex = Factor::from_values(&[
        Some("F".to_string()),
        Some("M".to_string()),
        Some("F".to_string()),
        None,
    ]);
    let ds = Dataset::from_columns(vec![
        ("sex".to_string(), Column::Categorical(sex)),
        (
            "score".to_string(),
            Column::Numeric(Array1::from_vec(vec![1.0, 5.0, 3.0, 9.0])),
        ),
    ])
    .unwrap();

    let counts = frequencies(&ds, "sex").unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0].level, "F");
    assert_eq!(counts[0].count, 2);
    assert!((counts[0].fraction - 2.0 / 3.0).abs() < 1e-12);

    let groups = describe_by(&ds, &["score"], "sex").unwrap();
    assert_eq!(groups.len(), 2);
    assert!((groups[0].summaries[0].mean - 2.0).abs() < 1e-12);
    assert!((groups[1].summaries[0].mean - 5.0).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Hypothesis tests
// ---------------------------------------------------------------------------

#[test]
fn paired_test_depends_on_row_alignment() {
    let (x, y) = sample(11, 40);
    let aligned = paired_t_test(&Array1::from_vec(x.clone()), &Array1::from_vec(y.clone())).unwrap();

    let mut shuffled = y.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(99));
    let misaligned =
        paired_t_test(&Array1::from_vec(x.clone()), &Array1::from_vec(shuffled)).unwrap();

    // Same mean difference, but the variance of the differences changes.
    assert!((aligned.estimate - misaligned.estimate).abs() < 1e-9);
    assert!((aligned.statistic - misaligned.statistic).abs() > 1e-3);
    assert!(aligned.p_value != misaligned.p_value);
}

#[test]
fn correlation_is_destroyed_by_shuffling() {
    let (x, y) = sample(12, 60);
    let r = pearson_test(&Array1::from_vec(x.clone()), &Array1::from_vec(y.clone())).unwrap();
    assert!(r.r > 0.9);
    assert!(r.p_value < 1e-6);

    let mut shuffled = y;
    shuffled.shuffle(&mut StdRng::seed_from_u64(7));
    let s = pearson_test(&Array1::from_vec(x), &Array1::from_vec(shuffled)).unwrap();
    assert!(s.r.abs() < r.r);
    assert!(s.conf_int.0 <= s.r && s.r <= s.conf_int.1);
}

#[test]
fn constant_at_reference_is_not_significant() {
    let chance = Array1::from_elem(25, 0.5);
    let test = one_sample_t_test(&chance, 0.5).unwrap();
    assert!(test.degenerate);
    assert_eq!(test.statistic, 0.0);
    assert_eq!(test.p_value, 1.0);
}

#[test]
fn constant_away_from_reference_is_degenerate_extreme() {
    let above = Array1::from_elem(10, 0.75);
    let test = one_sample_t_test(&above, 0.5).unwrap();
    assert!(test.degenerate);
    assert_eq!(test.statistic, f64::INFINITY);
    assert_eq!(test.p_value, 0.0);
}

#[test]
fn paired_test_skips_incomplete_pairs() {
    let x = Array1::from_vec(vec![1.0, 2.0, f64::NAN, 4.0, 5.0]);
    let y = Array1::from_vec(vec![1.5, 2.0, 3.0, f64::NAN, 6.0]);
    let t = paired_t_test(&x, &y).unwrap();
    assert_eq!(t.n, 3);
    let d = cohens_d_paired(&x, &y).unwrap();
    assert!(d < 0.0);
}

#[test]
fn too_few_rows_is_insufficient_data() {
    let x = Array1::from_vec(vec![1.0]);
    assert!(matches!(
        one_sample_t_test(&x, 0.0),
        Err(AnalysisError::InsufficientData { .. })
    ));
    let y = Array1::from_vec(vec![1.0, 2.0]);
    assert!(matches!(
        pearson_test(&y, &y),
        Err(AnalysisError::InsufficientData { .. })
    ));
}

#[test]
fn welch_ci_contains_estimate() {
    let a = Array1::from_vec(vec![98.0, 102.0, 105.0, 99.0, 101.0, 97.0]);
    let b = Array1::from_vec(vec![90.0, 94.0, 96.0, 89.0, 95.0, 93.0, 91.0]);
    let t = welch_t_test(&a, &b).unwrap();
    assert!(t.estimate > 0.0);
    assert!(t.conf_int.0 < t.estimate && t.estimate < t.conf_int.1);
    assert!(t.df > 5.0 && t.df < 11.0);
    assert!(t.p_value < 0.01);
}

// ---------------------------------------------------------------------------
// Standardization
// ---------------------------------------------------------------------------

#[test]
fn standardized_columns_have_zero_mean_unit_sd() {
    let (x, _) = sample(5, 30);
    let mut with_gap = x.clone();
    with_gap[3] = f64::NAN;
    let ds = Dataset::from_numeric(vec![("x", with_gap)]).unwrap();
    let ds = standardize_columns(ds, &["x"]).unwrap();

    let z = ds.numeric(&derived_name("x")).unwrap();
    assert!(z[3].is_nan());
    let s = summarize("z_x", z);
    assert!(s.mean.abs() < 1e-10);
    assert!((s.sd - 1.0).abs() < 1e-10);

    // raw column is kept alongside
    assert!(ds.numeric("x").is_ok());
}

#[test]
fn standardizing_twice_is_refused() {
    let ds = Dataset::from_numeric(vec![("x", vec![1.0, 2.0, 3.0])]).unwrap();
    let ds = standardize_columns(ds, &["x"]).unwrap();
    assert_eq!(
        standardize_columns(ds, &["x"]).unwrap_err(),
        AnalysisError::DuplicateColumn("z_x".to_string())
    );
}
