//! Rendering of analysis results: aligned console tables, SVG figures for the
//! paper, and the self-contained HTML report.
pub mod html;
pub mod plots;
pub mod text;

pub use html::{write_html_report, AnalysisReport, Labelled, OutcomeModels, Report, ReportSection};
