//! Data structures for the participant table.
//!
//! `Dataset` is an ordered set of equally long columns, one row per child.
//! Numeric columns store missing values as `NaN`; categorical columns store
//! them as `None`. Derived columns are appended with `with_column`, which
//! refuses to replace an existing name so the raw measurements stay
//! available next to their transforms.
use std::cmp::Ordering;

use indexmap::IndexMap;
use ndarray::Array1;

use crate::error::{AnalysisError, Result};

/// Column names of the fixed input schema.
pub mod columns {
    pub const CHILD_ID: &str = "child_id";
    pub const SEX: &str = "sex";
    pub const MOTHER_BIRTH_COUNTRY: &str = "mother_birth_country";
    pub const BIRTH_ORDER: &str = "birth_order";
    pub const AGE_MONTHS: &str = "age_months";
    pub const SES: &str = "ses";
    pub const EXPOSURE_18: &str = "exposure_18";
    pub const EXPOSURE_30: &str = "exposure_30";
    pub const VOCAB: &str = "vocab";
    pub const ACCURACY: &str = "accuracy";
    pub const RT: &str = "rt";
    pub const COMPOSITE_ENG: &str = "composite_eng";
    pub const COMPOSITE_SPA: &str = "composite_spa";
}

/// Every column the loader requires, in file order.
pub const SCHEMA: [&str; 13] = [
    columns::CHILD_ID,
    columns::SEX,
    columns::MOTHER_BIRTH_COUNTRY,
    columns::BIRTH_ORDER,
    columns::AGE_MONTHS,
    columns::SES,
    columns::EXPOSURE_18,
    columns::EXPOSURE_30,
    columns::VOCAB,
    columns::ACCURACY,
    columns::RT,
    columns::COMPOSITE_ENG,
    columns::COMPOSITE_SPA,
];

/// Columns recast to categorical by the normalizer.
pub const CATEGORICAL_COLUMNS: [&str; 3] = [
    columns::CHILD_ID,
    columns::MOTHER_BIRTH_COUNTRY,
    columns::SEX,
];

/// A categorical column: sorted levels plus a level index per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub levels: Vec<String>,
    pub codes: Vec<Option<usize>>,
}

impl Factor {
    /// Build a factor from raw text values. Levels are sorted numerically when
    /// both sides parse as numbers, lexically otherwise.
    pub fn from_values(values: &[Option<String>]) -> Self {
        let mut levels: Vec<String> = values.iter().flatten().cloned().collect();
        levels.sort_by(|a, b| compare_levels(a, b));
        levels.dedup();

        let codes = values
            .iter()
            .map(|v| {
                v.as_ref()
                    .and_then(|s| levels.iter().position(|level| level == s))
            })
            .collect();

        Factor { levels, codes }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn level_of(&self, row: usize) -> Option<&str> {
        self.codes[row].map(|c| self.levels[c].as_str())
    }
}

fn compare_levels(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Render a numeric code the way it would appear as a category label.
pub fn format_level(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Array1<f64>),
    Categorical(Factor),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Categorical(factor) => factor.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Numeric(values) => values[row].is_nan(),
            Column::Categorical(factor) => factor.codes[row].is_none(),
        }
    }

    pub fn as_numeric(&self) -> Option<&Array1<f64>> {
        match self {
            Column::Numeric(values) => Some(values),
            Column::Categorical(_) => None,
        }
    }

    pub fn as_factor(&self) -> Option<&Factor> {
        match self {
            Column::Categorical(factor) => Some(factor),
            Column::Numeric(_) => None,
        }
    }

    /// Per-row text labels, used when grouping either kind of column.
    pub fn labels(&self) -> Vec<Option<String>> {
        match self {
            Column::Numeric(values) => values
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(format_level(v)) })
                .collect(),
            Column::Categorical(factor) => (0..factor.len())
                .map(|row| factor.level_of(row).map(str::to_string))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: IndexMap<String, Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut dataset = Dataset::default();
        for (name, column) in columns {
            dataset = dataset.with_column(name, column)?;
        }
        Ok(dataset)
    }

    /// Convenience constructor for all-numeric tables.
    pub fn from_numeric<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        Self::from_columns(
            columns
                .into_iter()
                .map(|(name, values)| (name.into(), Column::Numeric(Array1::from_vec(values))))
                .collect(),
        )
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownColumn(name.to_string()))
    }

    pub fn numeric(&self, name: &str) -> Result<&Array1<f64>> {
        self.column(name)?
            .as_numeric()
            .ok_or_else(|| AnalysisError::NotNumeric(name.to_string()))
    }

    pub fn factor(&self, name: &str) -> Result<&Factor> {
        match self.column(name)? {
            Column::Categorical(factor) => Ok(factor),
            Column::Numeric(_) => Err(AnalysisError::UnknownColumn(format!(
                "{} (expected a categorical column)",
                name
            ))),
        }
    }

    /// Append a column. Existing columns are never replaced.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(AnalysisError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(AnalysisError::LengthMismatch(self.n_rows, column.len()));
        }
        self.columns.insert(name, column);
        Ok(self)
    }

    /// Change the representation of an existing column in place. Only the
    /// normalizer uses this; values keep their row positions.
    pub(crate) fn recast(&mut self, name: &str, column: Column) -> Result<()> {
        let slot = self
            .columns
            .get_mut(name)
            .ok_or_else(|| AnalysisError::UnknownColumn(name.to_string()))?;
        if column.len() != self.n_rows {
            return Err(AnalysisError::LengthMismatch(self.n_rows, column.len()));
        }
        *slot = column;
        Ok(())
    }

    /// Indices of rows with no missing value in any of `names`.
    pub fn complete_rows(&self, names: &[&str]) -> Result<Vec<usize>> {
        let cols = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.n_rows)
            .filter(|&row| cols.iter().all(|col| !col.is_missing(row)))
            .collect())
    }

    pub fn log_input_data_summary(&self) {
        let categorical = self
            .columns
            .values()
            .filter(|c| matches!(c, Column::Categorical(_)))
            .count();
        log::info!(
            "Dataset: {} rows, {} columns ({} categorical, {} numeric)",
            self.n_rows,
            self.n_cols(),
            categorical,
            self.n_cols() - categorical
        );
    }
}

/// Values of `values` at `rows`.
pub fn select(values: &Array1<f64>, rows: &[usize]) -> Array1<f64> {
    rows.iter().map(|&r| values[r]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_levels_sort_numerically() {
        let values = vec![
            Some("10".to_string()),
            Some("2".to_string()),
            None,
            Some("2".to_string()),
        ];
        let factor = Factor::from_values(&values);
        assert_eq!(factor.levels, vec!["2", "10"]);
        assert_eq!(factor.codes, vec![Some(1), Some(0), None, Some(0)]);
        assert_eq!(factor.level_of(0), Some("10"));
    }

    #[test]
    fn with_column_refuses_existing_name() {
        let ds = Dataset::from_numeric(vec![("a", vec![1.0, 2.0])]).unwrap();
        let err = ds
            .with_column("a", Column::Numeric(Array1::from_vec(vec![0.0, 0.0])))
            .unwrap_err();
        assert_eq!(err, AnalysisError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn complete_rows_skips_any_missing() {
        let ds = Dataset::from_numeric(vec![
            ("a", vec![1.0, f64::NAN, 3.0, 4.0]),
            ("b", vec![1.0, 2.0, f64::NAN, 4.0]),
        ])
        .unwrap();
        assert_eq!(ds.complete_rows(&["a", "b"]).unwrap(), vec![0, 3]);
        assert_eq!(ds.complete_rows(&["a"]).unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn format_level_drops_integer_fraction() {
        assert_eq!(format_level(1.0), "1");
        assert_eq!(format_level(2.5), "2.5");
    }
}
