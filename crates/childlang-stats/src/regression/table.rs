//! Multi-model comparison table in the layout journals expect: one column
//! per model, estimates with significance stars over standard errors, and
//! fit statistics at the bottom.
use std::collections::BTreeMap;

use maud::{html, Markup};

use crate::regression::{FittedModel, INTERCEPT};
use crate::report::text::{fmt_num, TextTable};

const CONSTANT_LABEL: &str = "Constant";
const STAR_NOTE: &str = "Note: + p<0.1; * p<0.05; ** p<0.01; *** p<0.001";

/// Stars for the conventional thresholds.
pub fn significance_stars(p: f64) -> &'static str {
    if p.is_nan() {
        ""
    } else if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else if p < 0.1 {
        "+"
    } else {
        ""
    }
}

pub struct ComparisonTable<'a> {
    title: String,
    models: &'a [FittedModel],
    labels: &'a BTreeMap<String, String>,
    digits: usize,
}

struct Cell {
    estimate: String,
    std_error: String,
}

impl<'a> ComparisonTable<'a> {
    pub fn new(title: &str, models: &'a [FittedModel], labels: &'a BTreeMap<String, String>) -> Self {
        Self {
            title: title.to_string(),
            models,
            labels,
            digits: 3,
        }
    }

    pub fn digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    fn label<'b>(&'b self, name: &'b str) -> &'b str {
        if name == INTERCEPT {
            return self.labels.get(name).map(String::as_str).unwrap_or(CONSTANT_LABEL);
        }
        self.labels.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Terms in order of first appearance, intercept last.
    fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for model in self.models {
            for c in &model.coefficients {
                if c.term != INTERCEPT && !terms.contains(&c.term) {
                    terms.push(c.term.clone());
                }
            }
        }
        terms.push(INTERCEPT.to_string());
        terms
    }

    fn cell(&self, model: &FittedModel, term: &str) -> Cell {
        match model.coefficient(term) {
            Some(c) => Cell {
                estimate: format!(
                    "{}{}",
                    fmt_num(c.estimate, self.digits),
                    significance_stars(c.p_value)
                ),
                std_error: format!("({})", fmt_num(c.std_error, self.digits)),
            },
            None => Cell {
                estimate: String::new(),
                std_error: String::new(),
            },
        }
    }

    fn dependent_label(&self) -> String {
        let mut responses: Vec<&str> = Vec::new();
        for m in self.models {
            let label = self.label(&m.response);
            if !responses.contains(&label) {
                responses.push(label);
            }
        }
        responses.join(" / ")
    }

    /// Fit statistic rows as (label, per-model values).
    fn stat_rows(&self) -> Vec<(&'static str, Vec<String>)> {
        let d = self.digits;
        vec![
            ("Observations", self.models.iter().map(|m| m.n_obs.to_string()).collect()),
            ("R2", self.models.iter().map(|m| fmt_num(m.r_squared, d)).collect()),
            ("Adjusted R2", self.models.iter().map(|m| fmt_num(m.adj_r_squared, d)).collect()),
            (
                "Residual Std. Error",
                self.models
                    .iter()
                    .map(|m| format!("{} (df = {})", fmt_num(m.sigma, d), m.df_residual))
                    .collect(),
            ),
            (
                "F Statistic",
                self.models
                    .iter()
                    .map(|m| {
                        format!(
                            "{}{} (df = {}; {})",
                            fmt_num(m.f_statistic, d),
                            significance_stars(m.f_p_value),
                            m.f_df.0,
                            m.f_df.1
                        )
                    })
                    .collect(),
            ),
        ]
    }

    pub fn render_text(&self) -> String {
        let mut headers = vec![String::new()];
        headers.extend((1..=self.models.len()).map(|i| format!("({})", i)));
        let mut table = TextTable::new(headers);

        let mut dep = vec![String::new()];
        dep.push(format!("Dependent variable: {}", self.dependent_label()));
        table.push(dep);
        let mut names = vec![String::new()];
        names.extend(self.models.iter().map(|m| m.name.clone()));
        table.push(names);
        table.rule();

        for term in self.terms() {
            let cells: Vec<Cell> = self.models.iter().map(|m| self.cell(m, &term)).collect();
            let mut est_row = vec![self.label(&term).to_string()];
            est_row.extend(cells.iter().map(|c| c.estimate.clone()));
            table.push(est_row);
            let mut se_row = vec![String::new()];
            se_row.extend(cells.into_iter().map(|c| c.std_error));
            table.push(se_row);
        }
        table.rule();

        for (label, values) in self.stat_rows() {
            let mut row = vec![label.to_string()];
            row.extend(values);
            table.push(row);
        }

        format!("{}\n{}{}\n", self.title, table.render(), STAR_NOTE)
    }

    pub fn render_html(&self) -> Markup {
        let terms = self.terms();
        let stat_rows = self.stat_rows();
        html! {
            table class="model-table" {
                caption { (self.title) }
                thead {
                    tr {
                        th {}
                        th colspan=(self.models.len()) { "Dependent variable: " (self.dependent_label()) }
                    }
                    tr {
                        th {}
                        @for (i, m) in self.models.iter().enumerate() {
                            th { "(" (i + 1) ") " (m.name) }
                        }
                    }
                }
                tbody {
                    @for term in &terms {
                        tr {
                            td { (self.label(term)) }
                            @for m in self.models {
                                td { (self.cell(m, term).estimate) }
                            }
                        }
                        tr class="se" {
                            td {}
                            @for m in self.models {
                                td { (self.cell(m, term).std_error) }
                            }
                        }
                    }
                    @for (label, values) in &stat_rows {
                        tr class="stat" {
                            td { (label) }
                            @for v in values {
                                td { (v) }
                            }
                        }
                    }
                }
                tfoot {
                    tr { td colspan=(self.models.len() + 1) { (STAR_NOTE) } }
                }
            }
        }
    }
}
