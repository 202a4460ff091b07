//! Integration tests for the table loader and normalizer.

mod common;

use childlang_stats::data_handling::{columns, Column, SCHEMA};
use childlang_stats::error::AnalysisError;
use childlang_stats::io::{load_dataset, validate_table_path};
use childlang_stats::preprocessing::normalize;

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

#[test]
fn loads_schema_and_drops_index_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_study_csv(dir.path(), 20, 1);
    let ds = load_dataset(&path).unwrap();

    assert_eq!(ds.n_rows(), 20);
    assert_eq!(ds.n_cols(), SCHEMA.len());
    let names: Vec<&str> = ds.column_names().collect();
    assert_eq!(names, SCHEMA.to_vec());
}

#[test]
fn missing_tokens_become_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_study_csv(dir.path(), 20, 1);
    let ds = load_dataset(&path).unwrap();

    // row 5 has an NA vocabulary cell
    assert!(ds.numeric(columns::VOCAB).unwrap()[5].is_nan());
    assert!(!ds.numeric(columns::VOCAB).unwrap()[4].is_nan());
}

#[test]
fn missing_schema_columns_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.csv");
    std::fs::write(&path, ",child_id,sex,vocab\n1,7,F,120\n").unwrap();

    let err = load_dataset(&path).unwrap_err();
    match err.downcast_ref::<AnalysisError>() {
        Some(AnalysisError::MissingColumns(missing)) => {
            assert!(missing.contains(&"composite_eng".to_string()));
            assert!(missing.contains(&"rt".to_string()));
            assert!(!missing.contains(&"vocab".to_string()));
        }
        other => panic!("expected MissingColumns, got {:?}", other),
    }
}

#[test]
fn text_in_numeric_column_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    let text = common::study_csv(4, 2);
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    // second data row, vocab field
    let mut fields: Vec<String> = lines[2].split(',').map(str::to_string).collect();
    fields[9] = "lots".to_string();
    lines[2] = fields.join(",");
    std::fs::write(&path, lines.join("\n")).unwrap();

    let err = load_dataset(&path).unwrap_err();
    match err.downcast_ref::<AnalysisError>() {
        Some(AnalysisError::Parse { column, value, row }) => {
            assert_eq!(column, "vocab");
            assert_eq!(value, "lots");
            assert_eq!(*row, 2);
        }
        other => panic!("expected Parse, got {:?}", other),
    }
}

#[test]
fn tsv_files_use_tab_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.tsv");
    std::fs::write(&path, common::study_csv(6, 3).replace(',', "\t")).unwrap();
    let ds = load_dataset(&path).unwrap();
    assert_eq!(ds.n_rows(), 6);
    assert_eq!(ds.n_cols(), SCHEMA.len());
}

#[test]
fn validate_table_path_checks_extension_and_existence() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("data.csv");
    std::fs::File::create(&csv).unwrap();
    assert!(validate_table_path(csv.to_str().unwrap()).is_ok());

    let txt = dir.path().join("data.txt");
    std::fs::File::create(&txt).unwrap();
    assert!(validate_table_path(txt.to_str().unwrap()).is_err());
    assert!(validate_table_path("/nonexistent/data.tsv").is_err());
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

#[test]
fn normalize_recasts_identifier_country_and_sex() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_study_csv(dir.path(), 12, 4);
    let ds = normalize(load_dataset(&path).unwrap()).unwrap();

    for name in [columns::CHILD_ID, columns::MOTHER_BIRTH_COUNTRY, columns::SEX] {
        assert!(
            matches!(ds.column(name).unwrap(), Column::Categorical(_)),
            "{} should be categorical",
            name
        );
    }
    let ids = ds.factor(columns::CHILD_ID).unwrap();
    assert_eq!(ids.levels.len(), 12);
    assert_eq!(ids.levels[0], "1000");
    assert_eq!(ds.factor(columns::SEX).unwrap().levels, vec!["F", "M"]);
    // birth order stays numeric for frequency tables
    assert!(ds.numeric(columns::BIRTH_ORDER).is_ok());
}
