use std::fmt::Debug;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use itertools_num::linspace;
use plotly::common::Mode;
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::partial::PartialCorrelation;

/// Page geometry of the residual scatterplots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    /// Width in pixels; 504 is a 7 inch page at 72 dpi.
    pub width: u32,
    pub height: u32,
    pub point_radius: u32,
    pub font_size: f64,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            width: 504,
            height: 504,
            point_radius: 3,
            font_size: 14.0,
        }
    }
}

pub fn partial_plot_file_name(outcome: &str, predictor: &str) -> String {
    format!("partial_{}_{}.svg", outcome, predictor)
}

/// `R² = 0.12`, the annotation shown on each residual plot.
pub fn r_squared_label(r_squared: f64) -> String {
    format!("R\u{b2} = {:.2}", r_squared)
}

fn padded_range(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let range = hi - lo;
    let pad = if range > 1e-9 { 0.05 * range } else { 0.5 * hi.abs().max(1.0) };
    (lo - pad, hi + pad)
}

fn draw_err<E: Debug>(path: &Path) -> impl Fn(E) -> anyhow::Error + '_ {
    move |e| anyhow!("Failed to draw plot {}: {:?}", path.display(), e)
}

/// Scatter of outcome residuals against predictor residuals with the fitted
/// line and the squared partial correlation, written as SVG to `path`.
pub fn render_partial_plot(
    partial: &PartialCorrelation,
    x_label: &str,
    y_label: &str,
    path: &Path,
    settings: &PlotSettings,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
    }

    let (x_lo, x_hi) = padded_range(&partial.predictor_residuals);
    let (y_lo, y_hi) = padded_range(&partial.outcome_residuals);
    let err = draw_err(path);

    let root = SVGBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE).map_err(&err)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(&err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .label_style(("sans-serif", settings.font_size - 2.0))
        .axis_desc_style(("sans-serif", settings.font_size))
        .draw()
        .map_err(&err)?;

    let radius = settings.point_radius;
    chart
        .draw_series(
            partial
                .predictor_residuals
                .iter()
                .zip(&partial.outcome_residuals)
                .map(|(&x, &y)| Circle::new((x, y), radius, BLACK.mix(0.6).filled())),
        )
        .map_err(&err)?;

    chart
        .draw_series(LineSeries::new(
            vec![(x_lo, partial.fit.at(x_lo)), (x_hi, partial.fit.at(x_hi))],
            BLUE.stroke_width(2),
        ))
        .map_err(&err)?;

    chart
        .draw_series(std::iter::once(Text::new(
            r_squared_label(partial.r_squared),
            (x_lo + 0.05 * (x_hi - x_lo), y_hi - 0.05 * (y_hi - y_lo)),
            ("sans-serif", settings.font_size).into_font(),
        )))
        .map_err(&err)?;

    root.present().map_err(&err)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Render every residual plot into `out_dir`, returning the written paths.
pub fn render_partial_plots<'a, I>(
    partials: I,
    labels: &dyn Fn(&str) -> String,
    out_dir: &Path,
    settings: &PlotSettings,
) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a PartialCorrelation>,
{
    create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut written = Vec::new();
    for partial in partials {
        let path = out_dir.join(partial_plot_file_name(&partial.outcome, &partial.predictor));
        let x_label = format!("{} (residualized)", labels(&partial.predictor));
        let y_label = format!("{} (residualized)", labels(&partial.outcome));
        render_partial_plot(partial, &x_label, &y_label, &path, settings)?;
        written.push(path);
    }
    Ok(written)
}

/// Interactive version of the residual scatter for the HTML report.
pub fn plot_partial_scatter(partial: &PartialCorrelation, x_label: &str, y_label: &str) -> Plot {
    let (x_lo, x_hi) = padded_range(&partial.predictor_residuals);
    let line_x: Vec<f64> = linspace(x_lo, x_hi, 100).collect();
    let line_y: Vec<f64> = line_x.iter().map(|&x| partial.fit.at(x)).collect();

    let points = Scatter::new(
        partial.predictor_residuals.clone(),
        partial.outcome_residuals.clone(),
    )
    .mode(Mode::Markers)
    .name("Children");

    let fit = Scatter::new(line_x, line_y)
        .mode(Mode::Lines)
        .name("Linear fit")
        .line(plotly::common::Line::new().color("blue"));

    let title = format!("{} vs {} ({})", y_label, x_label, r_squared_label(partial.r_squared));
    let mut plot = Plot::new();
    plot.add_trace(points);
    plot.add_trace(fit);
    plot.set_layout(
        Layout::new()
            .title(title.as_str())
            .x_axis(Axis::new().title(x_label))
            .y_axis(Axis::new().title(y_label)),
    );
    plot
}
