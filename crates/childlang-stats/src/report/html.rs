//! Self-contained HTML report: sections of maud markup and inline plotly
//! figures, plus the `AnalysisReport` collected by the pipeline.
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;
use serde::Serialize;

use crate::descriptive::{GroupCount, GroupSummary, Summary};
use crate::hypothesis::{Correlation, TTest};
use crate::partial::PartialCorrelation;
use crate::regression::{FittedModel, NestedComparison};
use crate::report::text::{fmt_num, fmt_p};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

const STYLE: &str = "
body { font-family: sans-serif; margin: 2em auto; max-width: 1100px; color: #222; }
h1 { border-bottom: 2px solid #444; }
section { margin-bottom: 2.5em; }
table { border-collapse: collapse; margin: 1em 0; font-size: 0.9em; }
th, td { padding: 3px 10px; text-align: right; }
th:first-child, td:first-child { text-align: left; }
thead tr:last-child th { border-bottom: 1px solid #444; }
tr.se td { color: #666; }
tr.stat:first-of-type td { border-top: 1px solid #444; }
caption { font-weight: bold; text-align: left; }
.code-container { background-color: #f5f5f5; padding: 10px; border-radius: 5px;
  overflow-x: auto; font-family: monospace; white-space: pre-wrap; }
";

/// A titled block of report content.
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, markup: Markup) {
        self.content.push(markup);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        self.content
            .push(html! { div class="plot" { (PreEscaped(plot.to_inline_html(None))) } });
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    (block)
                }
            }
        }
    }
}

pub struct Report {
    title: String,
    version: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    h1 { (self.title) }
                    p { "childlang " (self.version) ", generated " (generated.to_string()) }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create report: {}", path.display()))?;
        file.write_all(self.render().into_string().as_bytes())
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}

/// A labelled test result as it appears in the report.
#[derive(Debug, Clone, Serialize)]
pub struct Labelled<T> {
    pub label: String,
    pub result: T,
    /// Cohen's d accompanying a t-test, if computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<f64>,
}

/// Regression results for one outcome.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeModels {
    pub outcome: String,
    pub models: Vec<FittedModel>,
    pub comparisons: Vec<NestedComparison>,
    #[serde(skip)]
    pub table_text: String,
    #[serde(skip)]
    pub table_html: String,
}

/// Everything one run of the pipeline produced.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AnalysisReport {
    pub data_file: String,
    pub n_rows: usize,
    pub summaries: Vec<Summary>,
    pub frequencies: Vec<(String, Vec<GroupCount>)>,
    pub group_summaries: Vec<GroupSummary>,
    pub t_tests: Vec<Labelled<TTest>>,
    pub correlations: Vec<Labelled<Correlation>>,
    pub regressions: Vec<OutcomeModels>,
    pub partials: Vec<PartialCorrelation>,
    pub plot_files: Vec<String>,
    /// Non-fatal problems, e.g. a comparison that could not be fit.
    pub warnings: Vec<String>,
}

fn summary_table(summaries: &[Summary], labels: &dyn Fn(&str) -> String) -> Markup {
    html! {
        table {
            thead { tr { th { "Variable" } th { "n" } th { "Missing" } th { "Mean" } th { "SD" } th { "Min" } th { "Max" } } }
            tbody {
                @for s in summaries {
                    tr {
                        td { (labels(&s.column)) }
                        td { (s.n) }
                        td { (s.missing) }
                        td { (fmt_num(s.mean, 2)) }
                        td { (fmt_num(s.sd, 2)) }
                        td { (fmt_num(s.min, 2)) }
                        td { (fmt_num(s.max, 2)) }
                    }
                }
            }
        }
    }
}

fn test_section(report: &AnalysisReport) -> ReportSection {
    let mut section = ReportSection::new("Hypothesis tests");
    section.add_content(html! {
        table {
            thead { tr { th { "Test" } th { "n" } th { "Estimate" } th { "t" } th { "df" } th { "p" } th { "95% CI" } th { "d" } } }
            tbody {
                @for t in &report.t_tests {
                    tr {
                        td { (t.label) @if t.result.degenerate { " (zero variance)" } }
                        td { (t.result.n) }
                        td { (fmt_num(t.result.estimate, 3)) }
                        td { (fmt_num(t.result.statistic, 2)) }
                        td { (fmt_num(t.result.df, 2)) }
                        td { (fmt_p(t.result.p_value)) }
                        td { "[" (fmt_num(t.result.conf_int.0, 3)) ", " (fmt_num(t.result.conf_int.1, 3)) "]" }
                        td { (t.effect_size.map(|d| fmt_num(d, 2)).unwrap_or_default()) }
                    }
                }
            }
        }
        table {
            thead { tr { th { "Correlation" } th { "n" } th { "r" } th { "t" } th { "p" } th { "95% CI" } } }
            tbody {
                @for c in &report.correlations {
                    tr {
                        td { (c.label) }
                        td { (c.result.n) }
                        td { (fmt_num(c.result.r, 3)) }
                        td { (fmt_num(c.result.statistic, 2)) }
                        td { (fmt_p(c.result.p_value)) }
                        td { "[" (fmt_num(c.result.conf_int.0, 3)) ", " (fmt_num(c.result.conf_int.1, 3)) "]" }
                    }
                }
            }
        }
    });
    section
}

fn comparison_markup(comparisons: &[NestedComparison]) -> Markup {
    html! {
        table {
            caption { "Nested model comparisons" }
            thead { tr { th { "Baseline" } th { "Extended" } th { "Added" } th { "n" } th { "F" } th { "df" } th { "p" } th { "ΔR²" } } }
            tbody {
                @for c in comparisons {
                    tr {
                        td { (c.baseline) }
                        td { (c.extended) }
                        td { (c.added.join(", ")) }
                        td { (c.n_obs) }
                        td { (fmt_num(c.f_statistic, 2)) }
                        td { (c.df_diff) ", " (c.df_residual_extended) }
                        td { (fmt_p(c.p_value)) }
                        td { (fmt_num(c.delta_r_squared, 3)) }
                    }
                }
            }
        }
    }
}

/// Render the report to a standalone HTML page. `plots` are the interactive
/// residual scatters, in the same order as `report.partials`.
pub fn write_html_report<P: AsRef<Path>, C: Serialize>(
    report: &AnalysisReport,
    plots: Vec<Plot>,
    config: &C,
    labels: &dyn Fn(&str) -> String,
    path: P,
) -> Result<()> {
    let mut page = Report::new(
        "Child Bilingual Language Outcomes",
        env!("CARGO_PKG_VERSION"),
    );

    let mut overview = ReportSection::new("Sample");
    overview.add_content(html! {
        p { (report.n_rows) " children loaded from " code { (report.data_file) } "." }
        (summary_table(&report.summaries, labels))
        @for (column, counts) in &report.frequencies {
            table {
                thead { tr { th { (labels(column)) } th { "n" } th { "%" } } }
                tbody {
                    @for c in counts {
                        tr { td { (c.level) } td { (c.count) } td { (fmt_num(c.percent, 1)) } }
                    }
                }
            }
        }
        @for g in &report.group_summaries {
            h3 { (labels(&g.group)) " = " (g.level) }
            (summary_table(&g.summaries, labels))
        }
    });
    page.add_section(overview);
    page.add_section(test_section(report));

    for outcome in &report.regressions {
        let mut section = ReportSection::new(&format!("Models for {}", labels(&outcome.outcome)));
        section.add_content(PreEscaped(outcome.table_html.clone()));
        section.add_content(comparison_markup(&outcome.comparisons));
        page.add_section(section);
    }

    let mut partial_section = ReportSection::new("Partial correlations");
    partial_section.add_content(html! {
        table {
            thead { tr { th { "Outcome" } th { "Predictor" } th { "n" } th { "partial r" } th { "R²" } } }
            tbody {
                @for p in &report.partials {
                    tr {
                        td { (labels(&p.outcome)) }
                        td { (labels(&p.predictor)) }
                        td { (p.n) }
                        td { (fmt_num(p.r, 3)) }
                        td { (fmt_num(p.r_squared, 3)) }
                    }
                }
            }
        }
    });
    for plot in plots {
        partial_section.add_plot(plot);
    }
    page.add_section(partial_section);

    if !report.warnings.is_empty() {
        let mut warnings = ReportSection::new("Warnings");
        warnings.add_content(html! {
            ul { @for w in &report.warnings { li { (w) } } }
        });
        page.add_section(warnings);
    }

    let config_json = serde_json::to_string_pretty(config)?;
    let mut config_section = ReportSection::new("Configuration");
    config_section.add_content(html! {
        div class="code-container" {
            pre { code { (config_json) } }
        }
    });
    page.add_section(config_section);

    page.save_to_file(path)
}
