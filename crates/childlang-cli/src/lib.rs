//! Command-line surface of childlang: argument definitions, config
//! overrides and subcommand handlers. `main.rs` only sets up logging and
//! dispatches.
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};

use childlang_stats::config::{load_analysis_config, AnalysisConfig};
use childlang_stats::data_handling::{CATEGORICAL_COLUMNS, SCHEMA};
use childlang_stats::descriptive::{describe, frequencies, render_frequencies, render_summaries};
use childlang_stats::pipeline::{load_and_normalize, run_analysis};

pub const DEFAULT_REPORT_NAME: &str = "childlang_report.html";

pub fn build_cli() -> Command {
    Command::new("childlang")
        .version(clap::crate_version!())
        .about("Statistical analysis of child bilingual language outcomes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("analyze")
                .about("Run the full analysis: descriptives, tests, models and partial plots")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON analysis configuration. Defaults are used when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the participant table (.csv or .tsv). \
                             Overrides the data file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Directory the partial-correlation figures are written to.")
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Path of the HTML report. Defaults to <output-dir>/childlang_report.html.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("report"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Also write every computed result as JSON to this file.")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(Command::new("schema").about("Print the expected input columns"))
        .subcommand(
            Command::new("describe")
                .about("Load a participant table and print descriptive statistics only")
                .arg(
                    Arg::new("data")
                        .help("Path to the participant table (.csv or .tsv)")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("columns")
                        .long("columns")
                        .help("Comma-separated numeric columns to summarize.")
                        .value_delimiter(',')
                        .num_args(1..),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}

/// Resolve the analysis configuration: the JSON file (or defaults) with
/// command-line overrides applied.
pub fn config_from_arguments(matches: &ArgMatches) -> Result<AnalysisConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            load_analysis_config(path)?
        }
        None => {
            log::info!("No config file provided; using defaults");
            AnalysisConfig::default()
        }
    };

    if let Some(data) = matches.get_one::<String>("data") {
        config.data_file = data.clone();
    }
    if let Some(dir) = matches.get_one::<String>("output_dir") {
        config.output_dir = dir.clone();
    }
    if let Some(json) = matches.get_one::<String>("json") {
        config.json_file = Some(json.clone());
    }

    if matches.get_flag("no_report") {
        config.report_file = None;
    } else if let Some(report) = matches.get_one::<String>("report") {
        config.report_file = Some(report.clone());
    } else if config.report_file.is_none() {
        let default = Path::new(&config.output_dir).join(DEFAULT_REPORT_NAME);
        config.report_file = Some(default.display().to_string());
    }

    Ok(config)
}

pub fn handle_analyze(matches: &ArgMatches) -> Result<()> {
    let config = config_from_arguments(matches)?;
    let report = run_analysis(&config)?;
    log::info!(
        "Analyzed {} children; wrote {} figures to {}",
        report.n_rows,
        report.plot_files.len(),
        config.output_dir
    );
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }
    Ok(())
}

/// The fixed input schema, one column per line with its kind.
pub fn schema_text() -> String {
    let mut out = String::from("(row index, dropped)\n");
    for name in SCHEMA {
        let kind = if CATEGORICAL_COLUMNS.contains(&name) {
            "categorical"
        } else {
            "numeric"
        };
        out.push_str(&format!("{:<22}{}\n", name, kind));
    }
    out
}

pub fn handle_describe(matches: &ArgMatches) -> Result<()> {
    let data: &String = matches
        .get_one("data")
        .ok_or_else(|| anyhow::anyhow!("A data file is required"))?;
    let dataset = load_and_normalize(data)?;

    let defaults = AnalysisConfig::default();
    let columns: Vec<String> = match matches.get_many::<String>("columns") {
        Some(values) => values.cloned().collect(),
        None => defaults.descriptive_columns.clone(),
    };
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();

    let summaries = describe(&dataset, &names)?;
    println!("{}", render_summaries("Descriptive statistics", &summaries));

    let mut grouping = vec![defaults.group_column.clone()];
    grouping.extend(defaults.frequency_columns.iter().cloned());
    for column in grouping {
        let counts = frequencies(&dataset, &column)?;
        println!("{}", render_frequencies(&column, &counts));
    }
    Ok(())
}
