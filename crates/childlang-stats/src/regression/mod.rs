//! Ordinary least squares regression.
//!
//! Models are described by a `ModelSpec` (response plus an ordered predictor
//! list) and fit with an intercept on the rows complete for every variable
//! the model touches. Categorical predictors are treatment coded against
//! their first level, so `sex` with levels `F`/`M` contributes a `sexM` term.
pub mod nested;
pub mod table;

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::data_handling::{Column, Dataset};
use crate::error::{AnalysisError, Result};
use crate::hypothesis::two_sided_p;

pub use nested::{check_nested, compare_nested, nested_f_test, NestedComparison};
pub use table::{significance_stars, ComparisonTable};

pub const INTERCEPT: &str = "(Intercept)";

/// Relative singular-value cutoff below which a design is rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

/// Response plus ordered predictors of one linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub response: String,
    pub predictors: Vec<String>,
}

impl ModelSpec {
    pub fn new(name: &str, response: &str, predictors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            response: response.to_string(),
            predictors: predictors.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Response followed by predictors.
    pub fn variables(&self) -> Vec<&str> {
        std::iter::once(self.response.as_str())
            .chain(self.predictors.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub statistic: f64,
    pub p_value: f64,
}

/// A fitted OLS model. Residuals and fitted values are aligned to dataset
/// rows; rows excluded from the fit hold `NaN`.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub name: String,
    pub response: String,
    pub predictors: Vec<String>,
    pub coefficients: Vec<Coefficient>,
    pub n_obs: usize,
    pub df_residual: usize,
    pub rss: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Residual standard error.
    pub sigma: f64,
    pub f_statistic: f64,
    pub f_df: (f64, f64),
    pub f_p_value: f64,
    /// Dataset rows used in the fit, ascending.
    pub rows: Vec<usize>,
    #[serde(skip)]
    pub residuals: Array1<f64>,
    #[serde(skip)]
    pub fitted: Array1<f64>,
}

impl FittedModel {
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Residuals of the rows used in the fit, in row order.
    pub fn fit_residuals(&self) -> Vec<f64> {
        self.rows.iter().map(|&r| self.residuals[r]).collect()
    }
}

/// Design matrix (with intercept column) and response for a set of rows.
pub(crate) struct Design {
    pub terms: Vec<String>,
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
}

pub(crate) fn build_design(dataset: &Dataset, spec: &ModelSpec, rows: &[usize]) -> Result<Design> {
    let response = dataset.numeric(&spec.response)?;
    let mut terms = vec![INTERCEPT.to_string()];
    let mut columns: Vec<Vec<f64>> = vec![vec![1.0; rows.len()]];

    for predictor in &spec.predictors {
        match dataset.column(predictor)? {
            Column::Numeric(values) => {
                terms.push(predictor.clone());
                columns.push(rows.iter().map(|&r| values[r]).collect());
            }
            Column::Categorical(factor) => {
                let mut present: Vec<usize> = rows.iter().filter_map(|&r| factor.codes[r]).collect();
                present.sort_unstable();
                present.dedup();
                // first observed level is the reference
                for &code in present.iter().skip(1) {
                    terms.push(format!("{}{}", predictor, factor.levels[code]));
                    columns.push(
                        rows.iter()
                            .map(|&r| if factor.codes[r] == Some(code) { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }
    }

    let x = DMatrix::from_fn(rows.len(), columns.len(), |i, j| columns[j][i]);
    let y = DVector::from_iterator(rows.len(), rows.iter().map(|&r| response[r]));
    Ok(Design { terms, x, y })
}

/// Fit `spec` on the rows complete for all of its variables.
pub fn fit_ols(dataset: &Dataset, spec: &ModelSpec) -> Result<FittedModel> {
    let rows = dataset.complete_rows(&spec.variables())?;
    fit_ols_on_rows(dataset, spec, &rows)
}

/// Fit `spec` on an explicit row set. Every row must be complete.
pub fn fit_ols_on_rows(dataset: &Dataset, spec: &ModelSpec, rows: &[usize]) -> Result<FittedModel> {
    let design = build_design(dataset, spec, rows)?;
    let n = design.x.nrows();
    let p = design.x.ncols();
    if n <= p {
        return Err(AnalysisError::InsufficientData {
            what: format!("Model '{}'", spec.name),
            needed: p + 1,
            found: n,
        });
    }

    // rank check on the singular values; a Cholesky of exactly collinear
    // columns can still succeed with a rounding-sized pivot
    let singular_values = design.x.clone().svd(false, false).singular_values;
    let sv_max = singular_values.iter().copied().fold(0.0, f64::max);
    let sv_min = singular_values.iter().copied().fold(f64::INFINITY, f64::min);
    if !(sv_min > sv_max * RANK_TOLERANCE) {
        return Err(AnalysisError::SingularDesign(spec.name.clone()));
    }

    let xt = design.x.transpose();
    let chol = (&xt * &design.x)
        .cholesky()
        .ok_or_else(|| AnalysisError::SingularDesign(spec.name.clone()))?;
    let beta = chol.solve(&(&xt * &design.y));
    let xtx_inv = chol.inverse();
    if (0..p).any(|j| !xtx_inv[(j, j)].is_finite() || xtx_inv[(j, j)] <= 0.0) {
        return Err(AnalysisError::SingularDesign(spec.name.clone()));
    }

    let fitted = &design.x * &beta;
    let resid = &design.y - &fitted;
    let rss = resid.norm_squared();
    let df_residual = n - p;
    let sigma2 = rss / df_residual as f64;

    let mut coefficients = Vec::with_capacity(p);
    for (j, term) in design.terms.iter().enumerate() {
        let std_error = (sigma2 * xtx_inv[(j, j)]).sqrt();
        let statistic = beta[j] / std_error;
        let p_value = if statistic.is_nan() {
            f64::NAN
        } else {
            two_sided_p(statistic, df_residual as f64)?
        };
        coefficients.push(Coefficient {
            term: term.clone(),
            estimate: beta[j],
            std_error,
            statistic,
            p_value,
        });
    }

    let y_mean = design.y.mean();
    let tss: f64 = design.y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = 1.0 - rss / tss;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_residual as f64;

    let df_model = (p - 1) as f64;
    let (f_statistic, f_p_value) = if p > 1 {
        let f = ((tss - rss) / df_model) / sigma2;
        (f, f_upper_tail(f, df_model, df_residual as f64)?)
    } else {
        (f64::NAN, f64::NAN)
    };

    let mut residuals = Array1::from_elem(dataset.n_rows(), f64::NAN);
    let mut fitted_full = Array1::from_elem(dataset.n_rows(), f64::NAN);
    for (i, &row) in rows.iter().enumerate() {
        residuals[row] = resid[i];
        fitted_full[row] = fitted[i];
    }

    log::debug!(
        "Fitted '{}': {} ~ {} (n = {}, R2 = {:.3})",
        spec.name,
        spec.response,
        spec.predictors.join(" + "),
        n,
        r_squared
    );

    Ok(FittedModel {
        name: spec.name.clone(),
        response: spec.response.clone(),
        predictors: spec.predictors.clone(),
        coefficients,
        n_obs: n,
        df_residual,
        rss,
        r_squared,
        adj_r_squared,
        sigma: sigma2.sqrt(),
        f_statistic,
        f_df: (df_model, df_residual as f64),
        f_p_value,
        rows: rows.to_vec(),
        residuals,
        fitted: fitted_full,
    })
}

/// Upper-tail probability of an F statistic.
pub fn f_upper_tail(f: f64, d1: f64, d2: f64) -> Result<f64> {
    if f.is_nan() {
        return Ok(f64::NAN);
    }
    if f.is_infinite() {
        return Ok(0.0);
    }
    let f_dist = FisherSnedecor::new(d1, d2).map_err(|e| AnalysisError::Distribution(e.to_string()))?;
    Ok((1.0 - f_dist.cdf(f.max(0.0))).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Factor;

    fn toy() -> Dataset {
        Dataset::from_numeric(vec![
            ("y", vec![3.1, 4.9, 7.2, 8.8, 11.1, 13.0, 14.9, 17.2]),
            ("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
            ("w", vec![0.3, -0.1, 0.4, 0.2, -0.5, 0.1, 0.0, -0.2]),
        ])
        .unwrap()
    }

    #[test]
    fn recovers_slope_and_intercept() {
        let m = fit_ols(&toy(), &ModelSpec::new("m", "y", &["x"])).unwrap();
        let slope = m.coefficient("x").unwrap();
        assert!((slope.estimate - 2.0).abs() < 0.1, "slope {}", slope.estimate);
        assert!(slope.p_value < 1e-6);
        assert!(m.r_squared > 0.99);
        assert_eq!(m.df_residual, 6);
    }

    #[test]
    fn residuals_are_orthogonal_to_predictors() {
        let ds = toy();
        let m = fit_ols(&ds, &ModelSpec::new("m", "y", &["x", "w"])).unwrap();
        let resid = m.fit_residuals();
        assert!(resid.iter().sum::<f64>().abs() < 1e-9);
        for name in ["x", "w"] {
            let col = ds.numeric(name).unwrap();
            let dot: f64 = m.rows.iter().zip(&resid).map(|(&r, e)| col[r] * e).sum();
            assert!(dot.abs() < 1e-9, "{} . e = {}", name, dot);
        }
    }

    #[test]
    fn missing_rows_are_excluded_and_marked() {
        let mut y = vec![3.1, 4.9, 7.2, 8.8, 11.1, 13.0, 14.9, 17.2];
        y[2] = f64::NAN;
        let ds = Dataset::from_numeric(vec![
            ("y", y),
            ("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
        ])
        .unwrap();
        let m = fit_ols(&ds, &ModelSpec::new("m", "y", &["x"])).unwrap();
        assert_eq!(m.n_obs, 7);
        assert!(m.residuals[2].is_nan());
        assert!(!m.residuals[3].is_nan());
    }

    #[test]
    fn collinear_design_is_singular() {
        let ds = Dataset::from_numeric(vec![
            ("y", vec![1.0, 2.0, 3.0, 5.0, 4.0]),
            ("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b", vec![2.0, 4.0, 6.0, 8.0, 10.0]),
        ])
        .unwrap();
        let err = fit_ols(&ds, &ModelSpec::new("m", "y", &["a", "b"])).unwrap_err();
        assert_eq!(err, AnalysisError::SingularDesign("m".to_string()));
    }

    #[test]
    fn categorical_predictor_is_dummy_coded() {
        let sex = Factor::from_values(
            &["F", "M", "F", "M", "F", "M"]
                .iter()
                .map(|s| Some(s.to_string()))
                .collect::<Vec<_>>(),
        );
        let ds = Dataset::from_numeric(vec![("y", vec![1.0, 3.0, 1.2, 3.1, 0.9, 2.9])])
            .unwrap()
            .with_column("sex", Column::Categorical(sex))
            .unwrap();
        let m = fit_ols(&ds, &ModelSpec::new("m", "y", &["sex"])).unwrap();
        let terms: Vec<&str> = m.coefficients.iter().map(|c| c.term.as_str()).collect();
        assert_eq!(terms, vec![INTERCEPT, "sexM"]);
        assert!((m.coefficient("sexM").unwrap().estimate - 1.966_666_666_666_666_7).abs() < 1e-9);
    }
}
