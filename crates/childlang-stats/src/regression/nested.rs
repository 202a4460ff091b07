//! Nested-model F-tests.
use serde::Serialize;

use crate::data_handling::Dataset;
use crate::error::{AnalysisError, Result};
use crate::regression::{f_upper_tail, fit_ols_on_rows, FittedModel, ModelSpec};

/// F-test of the predictors an extended model adds to its baseline.
#[derive(Debug, Clone, Serialize)]
pub struct NestedComparison {
    pub baseline: String,
    pub extended: String,
    pub added: Vec<String>,
    pub n_obs: usize,
    pub rss_baseline: f64,
    pub rss_extended: f64,
    pub df_residual_baseline: usize,
    pub df_residual_extended: usize,
    pub df_diff: usize,
    pub f_statistic: f64,
    pub p_value: f64,
    pub delta_r_squared: f64,
}

/// Verify `baseline`'s predictors are a strict subset of `extended`'s and
/// return the added predictors in `extended` order.
pub fn check_nested(baseline: &ModelSpec, extended: &ModelSpec) -> Result<Vec<String>> {
    let mut offending: Vec<String> = baseline
        .predictors
        .iter()
        .filter(|p| !extended.predictors.contains(p))
        .cloned()
        .collect();
    if baseline.response != extended.response {
        offending.insert(0, format!("response {}", baseline.response));
    }

    let added: Vec<String> = extended
        .predictors
        .iter()
        .filter(|p| !baseline.predictors.contains(p))
        .cloned()
        .collect();

    if !offending.is_empty() || added.is_empty() {
        return Err(AnalysisError::NotNested {
            baseline: baseline.name.clone(),
            extended: extended.name.clone(),
            offending,
        });
    }
    Ok(added)
}

fn spec_of(model: &FittedModel) -> ModelSpec {
    ModelSpec {
        name: model.name.clone(),
        response: model.response.clone(),
        predictors: model.predictors.clone(),
    }
}

/// Compare two fitted models. Both must be nested and fit on the same rows.
pub fn nested_f_test(baseline: &FittedModel, extended: &FittedModel) -> Result<NestedComparison> {
    let added = check_nested(&spec_of(baseline), &spec_of(extended))?;
    if baseline.rows != extended.rows {
        return Err(AnalysisError::RowMismatch);
    }

    let df_diff = baseline.df_residual - extended.df_residual;
    let df_e = extended.df_residual as f64;
    let f_statistic =
        ((baseline.rss - extended.rss) / df_diff as f64) / (extended.rss / df_e);
    let p_value = f_upper_tail(f_statistic, df_diff as f64, df_e)?;

    log::debug!(
        "Nested test {} -> {}: F({}, {}) = {:.3}, p = {:.4}",
        baseline.name,
        extended.name,
        df_diff,
        extended.df_residual,
        f_statistic,
        p_value
    );

    Ok(NestedComparison {
        baseline: baseline.name.clone(),
        extended: extended.name.clone(),
        added,
        n_obs: extended.n_obs,
        rss_baseline: baseline.rss,
        rss_extended: extended.rss,
        df_residual_baseline: baseline.df_residual,
        df_residual_extended: extended.df_residual,
        df_diff,
        f_statistic,
        p_value,
        delta_r_squared: extended.r_squared - baseline.r_squared,
    })
}

/// Fit both models on the rows complete for the extended model's variables
/// and test the added predictors.
pub fn compare_nested(
    dataset: &Dataset,
    baseline: &ModelSpec,
    extended: &ModelSpec,
) -> Result<(FittedModel, FittedModel, NestedComparison)> {
    check_nested(baseline, extended)?;
    let rows = dataset.complete_rows(&extended.variables())?;
    let base_fit = fit_ols_on_rows(dataset, baseline, &rows)?;
    let ext_fit = fit_ols_on_rows(dataset, extended, &rows)?;
    let comparison = nested_f_test(&base_fit, &ext_fit)?;
    Ok((base_fit, ext_fit, comparison))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_baseline_with_foreign_predictor() {
        let base = ModelSpec::new("base", "y", &["A", "D"]);
        let ext = ModelSpec::new("ext", "y", &["A", "B", "C"]);
        match check_nested(&base, &ext) {
            Err(AnalysisError::NotNested { offending, .. }) => {
                assert_eq!(offending, vec!["D".to_string()])
            }
            other => panic!("expected NotNested, got {:?}", other),
        }
    }

    #[test]
    fn rejects_identical_predictor_sets() {
        let base = ModelSpec::new("base", "y", &["A", "B"]);
        let ext = ModelSpec::new("ext", "y", &["B", "A"]);
        assert!(check_nested(&base, &ext).is_err());
    }

    #[test]
    fn rejects_different_responses() {
        let base = ModelSpec::new("base", "y", &["A"]);
        let ext = ModelSpec::new("ext", "z", &["A", "B"]);
        assert!(check_nested(&base, &ext).is_err());
    }

    #[test]
    fn returns_added_predictors_in_extended_order() {
        let base = ModelSpec::new("base", "y", &["A"]);
        let ext = ModelSpec::new("ext", "y", &["C", "A", "B"]);
        assert_eq!(check_nested(&base, &ext).unwrap(), vec!["C", "B"]);
    }
}
