//! Type normalization and z-score standardization.
//!
//! `normalize` recasts the identifier, birth-country and sex columns to
//! categorical so grouping treats them as discrete. `standardize_columns`
//! appends `z_<name>` columns standardized over each source column's
//! non-missing rows with the sample standard deviation.

use ndarray::Array1;
use statrs::statistics::Statistics;

use crate::data_handling::{Column, Dataset, Factor, CATEGORICAL_COLUMNS};
use crate::descriptive::non_missing;
use crate::error::{AnalysisError, Result};

/// Mean/std pair fitted on the non-missing values of one column.
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    pub mean: f64,
    pub std: f64,
    pub n: usize,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-12;
}

/// Name of the standardized column derived from `source`.
pub fn derived_name(source: &str) -> String {
    format!("z_{}", source)
}

/// Fit a `Scaler` on the non-missing values of `values`.
pub fn fit_scaler(values: &Array1<f64>) -> Result<Scaler> {
    let present = non_missing(values);
    let n = present.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            what: "Standardization".to_string(),
            needed: 2,
            found: n,
        });
    }

    let mean = present.iter().mean();
    let std = present.iter().std_dev();
    if std < Scaler::MIN_STD {
        log::warn!("Standardizing a constant column; all z-scores will be 0");
    }

    Ok(Scaler {
        mean,
        std: std.max(Scaler::MIN_STD),
        n,
    })
}

/// Transform values with a fitted `Scaler`. Missing values stay missing.
pub fn transform(values: &Array1<f64>, sc: &Scaler) -> Array1<f64> {
    values.mapv(|v| (v - sc.mean) / sc.std)
}

/// Fit and transform in one call.
pub fn zscore(values: &Array1<f64>) -> Result<Array1<f64>> {
    let sc = fit_scaler(values)?;
    Ok(transform(values, &sc))
}

/// Append a standardized `z_<name>` column for each of `names`.
pub fn standardize_columns(dataset: Dataset, names: &[&str]) -> Result<Dataset> {
    let mut dataset = dataset;
    for name in names {
        let z = zscore(dataset.numeric(name)?)?;
        let derived = derived_name(name);
        log::debug!("Derived {} from {}", derived, name);
        dataset = dataset.with_column(derived, Column::Numeric(z))?;
    }
    Ok(dataset)
}

/// Recast a column to categorical; numeric codes become their text form.
pub fn to_categorical(column: &Column) -> Column {
    match column {
        Column::Categorical(_) => column.clone(),
        Column::Numeric(_) => Column::Categorical(Factor::from_values(&column.labels())),
    }
}

/// Recast the identifier, birth-country and sex columns to categorical.
pub fn normalize(dataset: Dataset) -> Result<Dataset> {
    let mut dataset = dataset;
    for name in CATEGORICAL_COLUMNS {
        let recast = to_categorical(dataset.column(name)?);
        if let Column::Categorical(factor) = &recast {
            log::debug!("Column '{}' has {} levels", name, factor.levels.len());
        }
        dataset.recast(name, recast)?;
    }
    Ok(dataset)
}
