//! End-to-end analysis run.
//!
//! Stages run in order: load and normalize, describe, hypothesis tests,
//! standardize, regression with nested comparisons, partial correlations and
//! their figures, then the optional HTML and JSON outputs. Each stage prints
//! its formatted section to stdout and every result lands in the returned
//! `AnalysisReport`.
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::Array1;

use crate::config::AnalysisConfig;
use crate::data_handling::{Dataset, Factor};
use crate::error::AnalysisError;
use crate::descriptive::{describe, describe_by, frequencies, mean_sd, render_frequencies, render_summaries};
use crate::hypothesis::{
    cohens_d_one_sample, cohens_d_paired, cohens_d_unpaired, one_sample_t_test_column,
    paired_t_test_columns, pearson_test_columns, render_correlation, render_t_test, welch_t_test,
};
use crate::io::{load_dataset, validate_table_path};
use crate::partial::{partial_correlation, PartialCorrelation};
use crate::preprocessing::{normalize, standardize_columns};
use crate::regression::{compare_nested, fit_ols, ComparisonTable, FittedModel, ModelSpec};
use crate::report::html::{write_html_report, AnalysisReport, Labelled, OutcomeModels};
use crate::report::plots::{plot_partial_scatter, render_partial_plots};

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}

/// Load, validate and normalize the participant table.
pub fn load_and_normalize(path: &str) -> Result<Dataset> {
    let path = validate_table_path(path)?;
    let dataset = load_dataset(&path)?;
    dataset.log_input_data_summary();
    let dataset = normalize(dataset)
        .with_context(|| format!("Failed to normalize {}", path.display()))?;
    Ok(dataset)
}

fn run_descriptives(dataset: &Dataset, config: &AnalysisConfig, report: &mut AnalysisReport) -> Result<()> {
    let columns = as_strs(&config.descriptive_columns);
    report.summaries = describe(dataset, &columns)?;
    println!("{}", render_summaries("Descriptive statistics", &report.summaries));

    let mut freq_columns = vec![config.group_column.clone()];
    freq_columns.extend(config.frequency_columns.iter().cloned());
    for column in freq_columns {
        let counts = frequencies(dataset, &column)?;
        println!("{}", render_frequencies(&column, &counts));
        report.frequencies.push((column, counts));
    }

    report.group_summaries = describe_by(dataset, &columns, &config.group_column)?;
    for g in &report.group_summaries {
        let title = format!("{} = {}", g.group, g.level);
        println!("{}", render_summaries(&title, &g.summaries));
    }
    Ok(())
}

/// Values of `column` split by the levels of `group`, in level order.
pub fn split_by_group(dataset: &Dataset, column: &str, group: &str) -> Result<Vec<(String, Array1<f64>)>> {
    let factor = Factor::from_values(&dataset.column(group)?.labels());
    let values = dataset.numeric(column)?;
    Ok(factor
        .levels
        .iter()
        .enumerate()
        .map(|(code, level)| {
            let subset: Array1<f64> = (0..factor.len())
                .filter(|&r| factor.codes[r] == Some(code))
                .map(|r| values[r])
                .collect();
            (level.clone(), subset)
        })
        .collect())
}

/// Too few complete values for one test is recorded as a warning and the
/// run moves on; any other failure stops it.
fn skip_if_insufficient<T>(
    label: &str,
    result: crate::error::Result<T>,
    report: &mut AnalysisReport,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ AnalysisError::InsufficientData { .. }) => {
            let msg = format!("Skipping {}: {}", label, e);
            log::warn!("{}", msg);
            report.warnings.push(msg);
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to run {}", label)),
    }
}

fn run_hypothesis_tests(dataset: &Dataset, config: &AnalysisConfig, report: &mut AnalysisReport) -> Result<()> {
    println!("Hypothesis tests");

    for pair in &config.paired_tests {
        let label = format!("{} vs {} (paired)", pair.a, pair.b);
        let result = paired_t_test_columns(dataset, &pair.a, &pair.b);
        let Some(test) = skip_if_insufficient(&label, result, report)? else {
            continue;
        };
        let d = cohens_d_paired(dataset.numeric(&pair.a)?, dataset.numeric(&pair.b)?).ok();
        println!("{}", render_t_test(&label, &test));
        report.t_tests.push(Labelled { label, result: test, effect_size: d });
    }

    for one in &config.one_sample_tests {
        let label = format!("{} vs {}", one.column, one.reference);
        let result = one_sample_t_test_column(dataset, &one.column, one.reference);
        let Some(test) = skip_if_insufficient(&label, result, report)? else {
            continue;
        };
        let values: Vec<f64> = dataset.numeric(&one.column)?.to_vec();
        let (mean, sd) = mean_sd(&values);
        let d = if test.degenerate {
            None
        } else {
            Some(cohens_d_one_sample(mean, sd, one.reference))
        };
        println!("{}", render_t_test(&label, &test));
        report.t_tests.push(Labelled { label, result: test, effect_size: d });
    }

    for column in &config.group_comparisons {
        let groups = split_by_group(dataset, column, &config.group_column)?;
        if groups.len() != 2 {
            let msg = format!(
                "Skipping {} by {}: expected 2 groups, found {}",
                column,
                config.group_column,
                groups.len()
            );
            log::warn!("{}", msg);
            report.warnings.push(msg);
            continue;
        }
        let (level_a, a) = &groups[0];
        let (level_b, b) = &groups[1];
        let label = format!(
            "{}: {} = {} vs {} (Welch)",
            column, config.group_column, level_a, level_b
        );
        let Some(test) = skip_if_insufficient(&label, welch_t_test(a, b), report)? else {
            continue;
        };
        let d = cohens_d_unpaired(a, b).ok();
        println!("{}", render_t_test(&label, &test));
        report.t_tests.push(Labelled { label, result: test, effect_size: d });
    }

    for pair in &config.correlations {
        let label = format!("{} ~ {}", pair.a, pair.b);
        let result = pearson_test_columns(dataset, &pair.a, &pair.b);
        let Some(correlation) = skip_if_insufficient(&label, result, report)? else {
            continue;
        };
        println!("{}", render_correlation(&label, &correlation));
        report.correlations.push(Labelled {
            label,
            result: correlation,
            effect_size: None,
        });
    }
    println!();
    Ok(())
}

/// Model specs of the configured design for one outcome.
pub fn model_specs(config: &AnalysisConfig, outcome: &str) -> Vec<ModelSpec> {
    config.models.iter().map(|m| m.for_outcome(outcome)).collect()
}

fn model_at<'a>(specs: &'a [ModelSpec], index: usize) -> Result<&'a ModelSpec> {
    index
        .checked_sub(1)
        .and_then(|i| specs.get(i))
        .ok_or_else(|| anyhow!("Model index {} out of range 1..={}", index, specs.len()))
}

fn run_regressions(dataset: &Dataset, config: &AnalysisConfig, report: &mut AnalysisReport) -> Result<()> {
    for outcome in &config.outcomes {
        let specs = model_specs(config, outcome);
        let models: Vec<FittedModel> = specs
            .iter()
            .map(|spec| {
                fit_ols(dataset, spec)
                    .with_context(|| format!("Failed to fit model '{}' for {}", spec.name, outcome))
            })
            .collect::<Result<_>>()?;

        let title = format!("Regression models for {}", config.label(outcome));
        let table = ComparisonTable::new(&title, &models, &config.labels);
        let table_text = table.render_text();
        let table_html = table.render_html().into_string();
        println!("{}", table_text);

        let mut comparisons = Vec::with_capacity(config.comparisons.len());
        println!("Nested comparisons for {}", outcome);
        for &(base, ext) in &config.comparisons {
            let baseline = model_at(&specs, base)?;
            let extended = model_at(&specs, ext)?;
            let (_, _, comparison) = compare_nested(dataset, baseline, extended).with_context(|| {
                format!("Failed to compare model {} with model {} for {}", base, ext, outcome)
            })?;
            println!(
                "  ({}) -> ({}) adds [{}]: F({}, {}) = {:.3}, p = {}, delta R2 = {:.3}, n = {}",
                base,
                ext,
                comparison.added.join(", "),
                comparison.df_diff,
                comparison.df_residual_extended,
                comparison.f_statistic,
                crate::report::text::fmt_p(comparison.p_value),
                comparison.delta_r_squared,
                comparison.n_obs
            );
            comparisons.push(comparison);
        }
        println!();

        report.regressions.push(OutcomeModels {
            outcome: outcome.clone(),
            models,
            comparisons,
            table_text,
            table_html,
        });
    }
    Ok(())
}

/// Covariates of a partial correlation: the reference model's predictors
/// without the predictor of interest.
pub fn partial_covariates(config: &AnalysisConfig, predictor: &str) -> Result<Vec<String>> {
    let index = config.partial_covariates_model;
    let template = index
        .checked_sub(1)
        .and_then(|i| config.models.get(i))
        .ok_or_else(|| anyhow!("Partial covariate model index {} out of range", index))?;
    Ok(template
        .predictors
        .iter()
        .filter(|p| p.as_str() != predictor)
        .cloned()
        .collect())
}

fn run_partials(dataset: &Dataset, config: &AnalysisConfig, report: &mut AnalysisReport) -> Result<()> {
    println!("Squared partial correlations");
    let mut partials: Vec<PartialCorrelation> = Vec::with_capacity(config.partials.len());
    for target in &config.partials {
        let covariates = partial_covariates(config, &target.predictor)?;
        let partial = partial_correlation(
            dataset,
            &target.outcome,
            &target.predictor,
            &as_strs(&covariates),
        )
        .with_context(|| {
            format!(
                "Failed to compute partial correlation of {} and {}",
                target.outcome, target.predictor
            )
        })?;
        println!(
            "  {} ~ {}: partial r = {:.3}, R2 = {:.3}, n = {}",
            target.outcome, target.predictor, partial.r, partial.r_squared, partial.n
        );
        partials.push(partial);
    }
    println!();

    let labels = |name: &str| config.label(name);
    let written = render_partial_plots(&partials, &labels, Path::new(&config.output_dir), &config.plot)?;
    report.plot_files = written.iter().map(|p| p.display().to_string()).collect();
    report.partials = partials;
    Ok(())
}

/// Write the report as pretty JSON.
pub fn write_json_report<P: AsRef<Path>>(report: &AnalysisReport, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;
    log::info!("Results written to {}", path.display());
    Ok(())
}

/// Run every stage of the analysis described by `config`.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisReport> {
    log::info!("Starting analysis of {}", config.data_file);
    let dataset = load_and_normalize(&config.data_file)?;

    let mut report = AnalysisReport {
        data_file: config.data_file.clone(),
        n_rows: dataset.n_rows(),
        ..Default::default()
    };

    log::info!("Computing descriptive statistics");
    run_descriptives(&dataset, config, &mut report)?;

    log::info!("Running hypothesis tests");
    run_hypothesis_tests(&dataset, config, &mut report)?;

    log::info!("Standardizing {} columns", config.standardize.len());
    let dataset = standardize_columns(dataset, &as_strs(&config.standardize))?;

    log::info!("Fitting regression models");
    run_regressions(&dataset, config, &mut report)?;

    log::info!("Computing partial correlations");
    run_partials(&dataset, config, &mut report)?;

    if let Some(path) = &config.report_file {
        let labels = |name: &str| config.label(name);
        let plots = report
            .partials
            .iter()
            .map(|p| {
                plot_partial_scatter(
                    p,
                    &format!("{} (residualized)", labels(&p.predictor)),
                    &format!("{} (residualized)", labels(&p.outcome)),
                )
            })
            .collect();
        write_html_report(&report, plots, config, &labels, path)?;
    }

    if let Some(path) = &config.json_file {
        write_json_report(&report, path)?;
    }

    log::info!("Analysis complete");
    Ok(report)
}
