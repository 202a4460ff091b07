//! Residual series and squared partial correlations.
//!
//! For an outcome `y`, a predictor of interest `x` and covariates `C`, the
//! residuals of `y ~ C` and of `x ~ C` are correlated; their squared Pearson
//! correlation is the squared partial correlation of `y` and `x` given `C`.
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::data_handling::Dataset;
use crate::error::{AnalysisError, Result};
use crate::hypothesis::pearson_r;
use crate::regression::{fit_ols_on_rows, FittedModel, ModelSpec};

/// Straight line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Line {
    pub intercept: f64,
    pub slope: f64,
}

impl Line {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialCorrelation {
    pub outcome: String,
    pub predictor: String,
    pub covariates: Vec<String>,
    pub n: usize,
    pub r: f64,
    pub r_squared: f64,
    /// Dataset rows the residuals belong to.
    pub rows: Vec<usize>,
    pub outcome_residuals: Vec<f64>,
    pub predictor_residuals: Vec<f64>,
    /// OLS line of outcome residuals on predictor residuals.
    pub fit: Line,
}

/// Simple least-squares line through paired values.
pub fn fit_line(x: &[f64], y: &[f64]) -> Line {
    let slope = x.iter().covariance(y.iter()) / x.iter().variance();
    Line {
        intercept: y.iter().mean() - slope * x.iter().mean(),
        slope,
    }
}

/// Fit the two auxiliary regressions on a common row set and correlate their
/// residuals.
pub fn partial_correlation(
    dataset: &Dataset,
    outcome: &str,
    predictor: &str,
    covariates: &[&str],
) -> Result<PartialCorrelation> {
    let mut variables = vec![outcome, predictor];
    variables.extend_from_slice(covariates);
    let rows = dataset.complete_rows(&variables)?;

    let (outcome_model, predictor_model) = auxiliary_models(dataset, outcome, predictor, covariates, &rows)?;
    let outcome_residuals = outcome_model.fit_residuals();
    let predictor_residuals = predictor_model.fit_residuals();

    if outcome_residuals.len() < 3 {
        return Err(AnalysisError::InsufficientData {
            what: "Partial correlation".to_string(),
            needed: 3,
            found: outcome_residuals.len(),
        });
    }

    let r = pearson_r(&predictor_residuals, &outcome_residuals).clamp(-1.0, 1.0);
    let fit = fit_line(&predictor_residuals, &outcome_residuals);

    log::info!(
        "Partial r2 of {} and {} given [{}]: {:.3} (n = {})",
        outcome,
        predictor,
        covariates.join(", "),
        r * r,
        rows.len()
    );

    Ok(PartialCorrelation {
        outcome: outcome.to_string(),
        predictor: predictor.to_string(),
        covariates: covariates.iter().map(|c| c.to_string()).collect(),
        n: rows.len(),
        r,
        r_squared: r * r,
        rows,
        outcome_residuals,
        predictor_residuals,
        fit,
    })
}

/// `outcome ~ covariates` and `predictor ~ covariates` on the given rows.
pub fn auxiliary_models(
    dataset: &Dataset,
    outcome: &str,
    predictor: &str,
    covariates: &[&str],
    rows: &[usize],
) -> Result<(FittedModel, FittedModel)> {
    let outcome_spec = ModelSpec::new(&format!("{} ~ covariates", outcome), outcome, covariates);
    let predictor_spec = ModelSpec::new(&format!("{} ~ covariates", predictor), predictor, covariates);
    Ok((
        fit_ols_on_rows(dataset, &outcome_spec, rows)?,
        fit_ols_on_rows(dataset, &predictor_spec, rows)?,
    ))
}
