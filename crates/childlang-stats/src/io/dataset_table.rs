//! Delimited participant-table reader.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::Array1;

use crate::data_handling::{Column, Dataset, Factor, CATEGORICAL_COLUMNS, SCHEMA};
use crate::error::AnalysisError;

/// Configuration for reading the participant table.
#[derive(Debug, Clone)]
pub struct TableReaderConfig {
    /// Columns that must be present after the index column is dropped.
    pub required_columns: Vec<String>,
    /// Required columns allowed to hold non-numeric text.
    pub text_columns: Vec<String>,
    /// Cell values treated as missing.
    pub missing_tokens: Vec<String>,
    /// Field delimiter. When `None`, tab for `.tsv` files and comma otherwise.
    pub delimiter: Option<u8>,
    /// Drop the leading row-index column written by the exporting tool.
    pub drop_index_column: bool,
}

impl Default for TableReaderConfig {
    fn default() -> Self {
        Self {
            required_columns: SCHEMA.iter().map(|c| c.to_string()).collect(),
            text_columns: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            missing_tokens: vec![
                "".to_string(),
                "NA".to_string(),
                "NaN".to_string(),
                "nan".to_string(),
                "N/A".to_string(),
                ".".to_string(),
            ],
            delimiter: None,
            drop_index_column: true,
        }
    }
}

/// Read the participant table using the fixed schema.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    load_dataset_with_config(path, &TableReaderConfig::default())
}

/// Read the participant table using a custom configuration.
pub fn load_dataset_with_config<P: AsRef<Path>>(
    path: P,
    config: &TableReaderConfig,
) -> Result<Dataset> {
    let path = path.as_ref();
    let delimiter = config.delimiter.unwrap_or_else(|| delimiter_for(path));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open data file: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read header row")?
        .clone();

    let first_kept = if config.drop_index_column { 1 } else { 0 };
    if headers.len() <= first_kept {
        return Err(anyhow!("Data file {} has no data columns", path.display()));
    }
    if config.drop_index_column {
        log::debug!(
            "Dropping row-index column '{}'",
            headers.get(0).unwrap_or_default()
        );
    }

    let names: Vec<String> = headers.iter().skip(first_kept).map(str::to_string).collect();
    check_required(&names, &config.required_columns)?;

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        push_record(&record, first_kept, &mut raw, config);
    }

    let mut columns = Vec::with_capacity(names.len());
    for (name, values) in names.into_iter().zip(raw) {
        let column = build_column(&name, values, config)?;
        columns.push((name, column));
    }

    let dataset = Dataset::from_columns(columns)?;
    log::info!(
        "Loaded {} rows and {} columns from {}",
        dataset.n_rows(),
        dataset.n_cols(),
        path.display()
    );
    Ok(dataset)
}

/// Check a path names an existing `.csv` or `.tsv` file.
pub fn validate_table_path(path: &str) -> Result<PathBuf> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(pb)
}

fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

fn check_required(names: &[String], required: &[String]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|r| !names.iter().any(|n| n == *r))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::MissingColumns(missing).into())
    }
}

fn push_record(
    record: &StringRecord,
    first_kept: usize,
    raw: &mut [Vec<Option<String>>],
    config: &TableReaderConfig,
) {
    for (col_idx, values) in raw.iter_mut().enumerate() {
        let cell = record.get(col_idx + first_kept).unwrap_or("");
        if config.missing_tokens.iter().any(|t| t == cell) {
            values.push(None);
        } else {
            values.push(Some(cell.to_string()));
        }
    }
}

fn build_column(
    name: &str,
    values: Vec<Option<String>>,
    config: &TableReaderConfig,
) -> Result<Column> {
    let mut numeric = Vec::with_capacity(values.len());
    let mut first_bad = None;
    for (row, value) in values.iter().enumerate() {
        match value {
            None => numeric.push(f64::NAN),
            Some(text) => match text.parse::<f64>() {
                Ok(v) => numeric.push(v),
                Err(_) => {
                    first_bad = Some((row, text.clone()));
                    break;
                }
            },
        }
    }

    match first_bad {
        None => Ok(Column::Numeric(Array1::from_vec(numeric))),
        Some((row, value)) => {
            let must_be_numeric = config.required_columns.iter().any(|c| c == name)
                && !config.text_columns.iter().any(|c| c == name);
            if must_be_numeric {
                Err(AnalysisError::Parse {
                    row: row + 1,
                    column: name.to_string(),
                    value,
                }
                .into())
            } else {
                Ok(Column::Categorical(Factor::from_values(&values)))
            }
        }
    }
}
