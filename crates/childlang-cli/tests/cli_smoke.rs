//! CLI binary smoke tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("childlang").unwrap()
}

const HEADER: &str = ",child_id,sex,mother_birth_country,birth_order,age_months,ses,\
exposure_18,exposure_30,vocab,accuracy,rt,composite_eng,composite_spa";

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("describe"))
        .stdout(predicate::str::contains("schema"));
}

#[test]
fn schema_prints_columns() {
    cmd()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("mother_birth_country"));
}

// ---------------------------------------------------------------------------
// describe / analyze
// ---------------------------------------------------------------------------

#[test]
fn describe_prints_summary_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kids.csv");
    let mut text = String::from(HEADER);
    text.push('\n');
    text.push_str("1,1,F,US,1,30,3,40,45,310,0.7,800,101,95\n");
    text.push_str("2,2,M,MX,2,31,4,60,62,280,0.6,850,98,102\n");
    text.push_str("3,3,F,CO,1,29,NA,55,50,NA,0.8,790,104,99\n");
    std::fs::write(&path, text).unwrap();

    cmd()
        .args(["describe", path.to_str().unwrap(), "--columns", "vocab,ses"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vocab"))
        .stdout(predicate::str::contains("mother_birth_country"));
}

#[test]
fn analyze_missing_data_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .args([
            "analyze",
            "--data",
            "/nonexistent/kids.csv",
            "-o",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .failure();
}

#[test]
fn describe_rejects_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.csv");
    std::fs::write(&path, ",child_id,sex\n1,1,F\n").unwrap();
    cmd()
        .args(["describe", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("composite_eng"));
}
