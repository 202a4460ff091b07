//! Descriptive statistics over column sets.
//!
//! Every statistic is computed on the non-missing values of its own column;
//! missing rows are counted, never propagated.
use ndarray::Array1;
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::data_handling::{Dataset, Factor};
use crate::error::Result;
use crate::report::text::{fmt_num, TextTable};

/// Summary of one numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub column: String,
    pub n: usize,
    pub missing: usize,
    pub mean: f64,
    pub sd: f64,
    pub min: f64,
    pub max: f64,
}

/// Count of one level of a grouping column.
#[derive(Debug, Clone, Serialize)]
pub struct GroupCount {
    pub level: String,
    pub count: usize,
    /// Fraction of the non-missing total.
    pub fraction: f64,
    pub percent: f64,
}

/// Summaries for the rows belonging to one level of a grouping column.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub level: String,
    pub summaries: Vec<Summary>,
}

/// Sample mean and standard deviation (n - 1) of the non-missing values.
pub fn mean_sd(values: &[f64]) -> (f64, f64) {
    let present = non_missing(values);
    // statrs yields NaN for an empty mean and for sd with fewer than two values
    (present.iter().mean(), present.iter().std_dev())
}

/// Values with the missing (NaN) entries removed.
pub fn non_missing<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Vec<f64> {
    values.into_iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Summarize a single column of values.
pub fn summarize(column: &str, values: &Array1<f64>) -> Summary {
    let present = non_missing(values);
    let (mean, sd) = mean_sd(&present);
    let (min, max) = if present.is_empty() {
        (f64::NAN, f64::NAN)
    } else {
        (
            Statistics::min(present.iter()),
            Statistics::max(present.iter()),
        )
    };

    Summary {
        column: column.to_string(),
        n: present.len(),
        missing: values.len() - present.len(),
        mean,
        sd,
        min,
        max,
    }
}

/// One `Summary` per requested column.
pub fn describe(dataset: &Dataset, columns: &[&str]) -> Result<Vec<Summary>> {
    columns
        .iter()
        .map(|name| Ok(summarize(name, dataset.numeric(name)?)))
        .collect()
}

/// Level counts of a categorical or discrete numeric column.
pub fn frequencies(dataset: &Dataset, column: &str) -> Result<Vec<GroupCount>> {
    let factor = Factor::from_values(&dataset.column(column)?.labels());
    let mut counts = vec![0usize; factor.levels.len()];
    for code in factor.codes.iter().flatten() {
        counts[*code] += 1;
    }
    let total: usize = counts.iter().sum();

    Ok(factor
        .levels
        .iter()
        .zip(counts)
        .map(|(level, count)| {
            let fraction = if total == 0 {
                f64::NAN
            } else {
                count as f64 / total as f64
            };
            GroupCount {
                level: level.clone(),
                count,
                fraction,
                percent: fraction * 100.0,
            }
        })
        .collect())
}

/// Summaries of `columns` within each level of `group`.
pub fn describe_by(dataset: &Dataset, columns: &[&str], group: &str) -> Result<Vec<GroupSummary>> {
    let factor = Factor::from_values(&dataset.column(group)?.labels());
    let mut out = Vec::with_capacity(factor.levels.len());

    for (code, level) in factor.levels.iter().enumerate() {
        let rows: Vec<usize> = (0..factor.len())
            .filter(|&r| factor.codes[r] == Some(code))
            .collect();
        let summaries = columns
            .iter()
            .map(|name| {
                let values = dataset.numeric(name)?;
                let subset: Array1<f64> = rows.iter().map(|&r| values[r]).collect();
                Ok(summarize(name, &subset))
            })
            .collect::<Result<Vec<_>>>()?;
        out.push(GroupSummary {
            group: group.to_string(),
            level: level.clone(),
            summaries,
        });
    }

    Ok(out)
}

pub fn render_summaries(title: &str, summaries: &[Summary]) -> String {
    let mut table = TextTable::new(vec!["variable", "n", "missing", "mean", "sd", "min", "max"]);
    for s in summaries {
        table.push(vec![
            s.column.clone(),
            s.n.to_string(),
            s.missing.to_string(),
            fmt_num(s.mean, 2),
            fmt_num(s.sd, 2),
            fmt_num(s.min, 2),
            fmt_num(s.max, 2),
        ]);
    }
    format!("{}\n{}", title, table.render())
}

pub fn render_frequencies(column: &str, counts: &[GroupCount]) -> String {
    let mut table = TextTable::new(vec![column, "n", "percent"]);
    for c in counts {
        table.push(vec![
            c.level.clone(),
            c.count.to_string(),
            format!("{}%", fmt_num(c.percent, 1)),
        ]);
    }
    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_ignores_missing() {
        let values = Array1::from_vec(vec![2.0, f64::NAN, 4.0, 6.0]);
        let s = summarize("x", &values);
        assert_eq!(s.n, 3);
        assert_eq!(s.missing, 1);
        assert!((s.mean - 4.0).abs() < 1e-12);
        assert!((s.sd - 2.0).abs() < 1e-12);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 6.0);
    }

    #[test]
    fn summarize_all_missing_is_nan_not_panic() {
        let values = Array1::from_vec(vec![f64::NAN, f64::NAN]);
        let s = summarize("x", &values);
        assert_eq!(s.n, 0);
        assert!(s.mean.is_nan());
        assert!(s.min.is_nan());
    }

    #[test]
    fn frequencies_use_non_missing_total() {
        let ds = Dataset::from_numeric(vec![("birth_order", vec![1.0, 2.0, 1.0, f64::NAN, 3.0])])
            .unwrap();
        let counts = frequencies(&ds, "birth_order").unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].level, "1");
        assert_eq!(counts[0].count, 2);
        assert!((counts[0].fraction - 0.5).abs() < 1e-12);
        let total: f64 = counts.iter().map(|c| c.fraction).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
