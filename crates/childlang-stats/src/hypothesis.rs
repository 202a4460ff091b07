//! t-tests, Cohen's d and Pearson correlation tests.
//!
//! All tests are two-sided. Rows with a missing value in any input of a
//! given test are excluded from that test only.
use ndarray::Array1;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use statrs::statistics::Statistics;

use crate::data_handling::Dataset;
use crate::descriptive::{mean_sd, non_missing};
use crate::error::{AnalysisError, Result};
use crate::report::text::{fmt_num, fmt_p};

const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TTestKind {
    Paired,
    OneSample,
    Welch,
}

/// Result of a t-test.
#[derive(Debug, Clone, Serialize)]
pub struct TTest {
    pub kind: TTestKind,
    pub n: usize,
    /// Mean difference (paired, Welch) or sample mean (one sample).
    pub estimate: f64,
    /// Value the estimate is tested against.
    pub reference: f64,
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub conf_int: (f64, f64),
    /// Zero-variance input: the statistic is 0 or infinite rather than a
    /// proper t value.
    pub degenerate: bool,
}

/// Result of a Pearson correlation test.
#[derive(Debug, Clone, Serialize)]
pub struct Correlation {
    pub n: usize,
    pub r: f64,
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    /// Fisher-z interval; `NaN` bounds with fewer than four pairs.
    pub conf_int: (f64, f64),
}

fn students_t(df: f64) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| AnalysisError::Distribution(e.to_string()))
}

/// Two-sided p-value of a t statistic.
pub fn two_sided_p(statistic: f64, df: f64) -> Result<f64> {
    if statistic.is_infinite() {
        return Ok(0.0);
    }
    let dist = students_t(df)?;
    Ok((2.0 * (1.0 - dist.cdf(statistic.abs()))).clamp(0.0, 1.0))
}

fn present(values: &Array1<f64>) -> Vec<f64> {
    non_missing(values)
}

/// Zero up to rounding, relative to the magnitude of `scale`.
fn negligible(value: f64, scale: f64) -> bool {
    value.abs() <= 1e-12 * scale.abs().max(1.0)
}

fn degenerate_outcome(diff: f64, scale: f64) -> (f64, f64) {
    if negligible(diff, scale) {
        (0.0, 1.0)
    } else {
        (diff.signum() * f64::INFINITY, 0.0)
    }
}

/// Pairs of values where neither side is missing.
pub fn complete_pairs(x: &Array1<f64>, y: &Array1<f64>) -> Result<(Vec<f64>, Vec<f64>)> {
    if x.len() != y.len() {
        return Err(AnalysisError::LengthMismatch(x.len(), y.len()));
    }
    Ok(x.iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip())
}

fn insufficient(what: &str, needed: usize, found: usize) -> AnalysisError {
    AnalysisError::InsufficientData {
        what: what.to_string(),
        needed,
        found,
    }
}

/// One-sample machinery shared by the one-sample and paired tests.
fn t_test_from_sample(values: &[f64], mu: f64, kind: TTestKind) -> Result<TTest> {
    let n = values.len();
    if n < 2 {
        return Err(insufficient("t-test", 2, n));
    }
    let (mean, sd) = mean_sd(values);
    let df = (n - 1) as f64;
    let diff = mean - mu;

    if negligible(sd, mean) {
        log::warn!(
            "t-test on constant data (mean {}, reference {}); reporting degenerate result",
            mean,
            mu
        );
        let (statistic, p_value) = degenerate_outcome(diff, mean.abs().max(mu.abs()));
        return Ok(TTest {
            kind,
            n,
            estimate: mean,
            reference: mu,
            statistic,
            df,
            p_value,
            conf_int: (mean, mean),
            degenerate: true,
        });
    }

    let se = sd / (n as f64).sqrt();
    let statistic = diff / se;
    let p_value = two_sided_p(statistic, df)?;
    let crit = students_t(df)?.inverse_cdf(0.5 + CONFIDENCE / 2.0);

    Ok(TTest {
        kind,
        n,
        estimate: mean,
        reference: mu,
        statistic,
        df,
        p_value,
        conf_int: (mean - crit * se, mean + crit * se),
        degenerate: false,
    })
}

/// One-sample t-test of the mean of `x` against `mu`.
pub fn one_sample_t_test(x: &Array1<f64>, mu: f64) -> Result<TTest> {
    t_test_from_sample(&present(x), mu, TTestKind::OneSample)
}

/// Paired t-test of `x - y` against zero over row-aligned complete pairs.
pub fn paired_t_test(x: &Array1<f64>, y: &Array1<f64>) -> Result<TTest> {
    let (a, b) = complete_pairs(x, y)?;
    let diffs: Vec<f64> = a.iter().zip(&b).map(|(p, q)| p - q).collect();
    t_test_from_sample(&diffs, 0.0, TTestKind::Paired)
}

/// Welch two-sample t-test of `mean(x) - mean(y)`.
pub fn welch_t_test(x: &Array1<f64>, y: &Array1<f64>) -> Result<TTest> {
    let a = present(x);
    let b = present(y);
    if a.len() < 2 || b.len() < 2 {
        return Err(insufficient("Welch t-test", 2, a.len().min(b.len())));
    }
    let (mx, sx) = mean_sd(&a);
    let (my, sy) = mean_sd(&b);
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let vx = sx * sx / na;
    let vy = sy * sy / nb;
    let se = (vx + vy).sqrt();
    let diff = mx - my;

    if negligible(se, mx.abs().max(my.abs())) {
        let (statistic, p_value) = degenerate_outcome(diff, mx.abs().max(my.abs()));
        return Ok(TTest {
            kind: TTestKind::Welch,
            n: a.len() + b.len(),
            estimate: diff,
            reference: 0.0,
            statistic,
            df: na + nb - 2.0,
            p_value,
            conf_int: (diff, diff),
            degenerate: true,
        });
    }

    let df = (vx + vy).powi(2) / (vx * vx / (na - 1.0) + vy * vy / (nb - 1.0));
    let statistic = diff / se;
    let p_value = two_sided_p(statistic, df)?;
    let crit = students_t(df)?.inverse_cdf(0.5 + CONFIDENCE / 2.0);

    Ok(TTest {
        kind: TTestKind::Welch,
        n: a.len() + b.len(),
        estimate: diff,
        reference: 0.0,
        statistic,
        df,
        p_value,
        conf_int: (diff - crit * se, diff + crit * se),
        degenerate: false,
    })
}

/// Cohen's d for paired samples: mean difference over the sd of differences.
pub fn cohens_d_paired(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64> {
    let (a, b) = complete_pairs(x, y)?;
    if a.len() < 2 {
        return Err(insufficient("Cohen's d", 2, a.len()));
    }
    let diffs: Vec<f64> = a.iter().zip(&b).map(|(p, q)| p - q).collect();
    let (mean, sd) = mean_sd(&diffs);
    Ok(mean / sd)
}

/// Cohen's d for independent samples using the pooled standard deviation.
pub fn cohens_d_unpaired(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64> {
    let a = present(x);
    let b = present(y);
    if a.len() < 2 || b.len() < 2 {
        return Err(insufficient("Cohen's d", 2, a.len().min(b.len())));
    }
    let (mx, sx) = mean_sd(&a);
    let (my, sy) = mean_sd(&b);
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let pooled = (((na - 1.0) * sx * sx + (nb - 1.0) * sy * sy) / (na + nb - 2.0)).sqrt();
    Ok((mx - my) / pooled)
}

/// Cohen's d of a one-sample design from summary values alone.
pub fn cohens_d_one_sample(mean: f64, sd: f64, reference: f64) -> f64 {
    (mean - reference) / sd
}

/// Cohen's d of raw values against a reference mean.
pub fn cohens_d_against(x: &Array1<f64>, reference: f64) -> Result<f64> {
    let values = present(x);
    if values.len() < 2 {
        return Err(insufficient("Cohen's d", 2, values.len()));
    }
    let (mean, sd) = mean_sd(&values);
    Ok(cohens_d_one_sample(mean, sd, reference))
}

/// Pearson product-moment correlation.
pub fn pearson_r(x: &[f64], y: &[f64]) -> f64 {
    x.iter().covariance(y.iter()) / (x.iter().std_dev() * y.iter().std_dev())
}

/// Pearson correlation test over pairwise complete observations.
pub fn pearson_test(x: &Array1<f64>, y: &Array1<f64>) -> Result<Correlation> {
    let (a, b) = complete_pairs(x, y)?;
    let n = a.len();
    if n < 3 {
        return Err(insufficient("Correlation test", 3, n));
    }
    let r = pearson_r(&a, &b).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let statistic = r * (df / (1.0 - r * r)).sqrt();
    let p_value = if r.is_nan() {
        f64::NAN
    } else {
        two_sided_p(statistic, df)?
    };

    let conf_int = if n > 3 && r.abs() < 1.0 {
        let z = r.atanh();
        let se = 1.0 / ((n - 3) as f64).sqrt();
        let crit = Normal::new(0.0, 1.0)
            .map_err(|e| AnalysisError::Distribution(e.to_string()))?
            .inverse_cdf(0.5 + CONFIDENCE / 2.0);
        ((z - crit * se).tanh(), (z + crit * se).tanh())
    } else {
        (f64::NAN, f64::NAN)
    };

    Ok(Correlation {
        n,
        r,
        statistic,
        df,
        p_value,
        conf_int,
    })
}

pub fn paired_t_test_columns(dataset: &Dataset, a: &str, b: &str) -> Result<TTest> {
    paired_t_test(dataset.numeric(a)?, dataset.numeric(b)?)
}

pub fn one_sample_t_test_column(dataset: &Dataset, column: &str, mu: f64) -> Result<TTest> {
    one_sample_t_test(dataset.numeric(column)?, mu)
}

pub fn pearson_test_columns(dataset: &Dataset, a: &str, b: &str) -> Result<Correlation> {
    pearson_test(dataset.numeric(a)?, dataset.numeric(b)?)
}

pub fn render_t_test(label: &str, test: &TTest) -> String {
    let estimate = match test.kind {
        TTestKind::OneSample => format!(
            "mean = {} (ref {})",
            fmt_num(test.estimate, 3),
            fmt_num(test.reference, 2)
        ),
        TTestKind::Paired | TTestKind::Welch => {
            format!("mean diff = {}", fmt_num(test.estimate, 3))
        }
    };
    let flag = if test.degenerate { " [zero variance]" } else { "" };
    format!(
        "{}: t({}) = {}, p = {}, {}, 95% CI [{}, {}], n = {}{}",
        label,
        fmt_num(test.df, if test.kind == TTestKind::Welch { 2 } else { 0 }),
        fmt_num(test.statistic, 2),
        fmt_p(test.p_value),
        estimate,
        fmt_num(test.conf_int.0, 3),
        fmt_num(test.conf_int.1, 3),
        test.n,
        flag
    )
}

pub fn render_correlation(label: &str, c: &Correlation) -> String {
    format!(
        "{}: r({}) = {}, t = {}, p = {}, 95% CI [{}, {}], n = {}",
        label,
        fmt_num(c.df, 0),
        fmt_num(c.r, 3),
        fmt_num(c.statistic, 2),
        fmt_p(c.p_value),
        fmt_num(c.conf_int.0, 3),
        fmt_num(c.conf_int.1, 3),
        c.n
    )
}
