#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use crate::analysis::ClusterReport;
use crate::error::AppError;
use crate::survey::Sentiment;
use plotters::prelude::*;
use std::fmt::Display;
use std::ops::Range;

/// Configuration options for the cluster scatter chart
///
/// This structure contains the customizable properties of the chart
/// rendered on the admin dashboard.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis (service score)
    pub x_label: String,

    /// Label for the Y-axis (overall score)
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    /// Creates the dashboard's chart configuration
    ///
    /// # Returns
    /// * `GraphOptions` - Default configuration with:
    ///   - The cluster chart title and axis labels
    ///   - 800x560 pixel dimensions
    fn default() -> Self {
        Self {
            title: "Kluster Sentimen Responden".to_string(),
            x_label: "Rata-rata Skor Layanan (Umum/BPJS)".to_string(),
            y_label: "Rata-rata Skor Keseluruhan".to_string(),
            width: 800,
            height: 560,
        }
    }
}

/// Likert scores run from 1 to 5
const SCORE_MIN: f64 = 1.0;
const SCORE_MAX: f64 = 5.0;
const AXIS_PADDING: f64 = 0.5;

/// Colour used for a sentiment's points and legend entry
pub fn sentiment_color(sentiment: Sentiment) -> RGBColor {
    match sentiment {
        Sentiment::Negative => RGBColor(214, 39, 40),
        Sentiment::Neutral => RGBColor(255, 165, 0),
        Sentiment::Positive => RGBColor(44, 160, 44),
    }
}

/// Axis range covering the whole score scale plus any out-of-scale value
///
/// # Arguments
/// * `values` - Coordinates plotted on this axis
///
/// # Returns
/// * `Range<f64>` - The padded axis range
pub fn axis_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((SCORE_MIN, SCORE_MAX), |(lo, hi), v| (lo.min(v), hi.max(v)));

    (min - AXIS_PADDING)..(max + AXIS_PADDING)
}

fn chart_error(e: impl Display) -> AppError {
    AppError::Chart(e.to_string())
}

/// Renders the cluster scatter chart as an SVG document
///
/// Each respondent is a point at (service score, overall score), coloured by
/// the sentiment of its cluster. Sentiments are drawn in the fixed order
/// Negative, Neutral, Positive so the legend is stable. Cluster centres are
/// drawn as black crosses.
///
/// # Arguments
/// * `report` - Clustered rows and centres
/// * `options` - Graph styling options
///
/// # Returns
/// * A Result containing the SVG markup or an error
///
/// # Implementation Notes
/// * Uses the plotters SVG backend so the chart can be inlined in the page
/// * Text layout needs a system font; a missing font surfaces as `AppError::Chart`
pub fn render_cluster_chart(
    report: &ClusterReport,
    options: &GraphOptions,
) -> Result<String, AppError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let x_range = axis_range(
            report
                .rows
                .iter()
                .map(|r| r.point.service_score)
                .chain(report.centers.iter().map(|c| c.service_score)),
        );
        let y_range = axis_range(
            report
                .rows
                .iter()
                .map(|r| r.point.overall_score)
                .chain(report.centers.iter().map(|c| c.overall_score)),
        );

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()
            .map_err(chart_error)?;

        for sentiment in Sentiment::ORDER {
            let color = sentiment_color(sentiment);
            let points: Vec<(f64, f64)> = report
                .rows
                .iter()
                .filter(|r| r.sentiment == Some(sentiment))
                .map(|r| (r.point.service_score, r.point.overall_score))
                .collect();

            chart
                .draw_series(
                    points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 6, color.filled())),
                )
                .map_err(chart_error)?
                .label(sentiment.cluster_label())
                .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
        }

        chart
            .draw_series(report.centers.iter().map(|c| {
                Cross::new(
                    (c.service_score, c.overall_score),
                    8,
                    BLACK.stroke_width(3),
                )
            }))
            .map_err(chart_error)?
            .label("Pusat Kluster")
            .legend(|(x, y)| Cross::new((x, y), 5, BLACK.stroke_width(2)));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::LowerRight)
            .draw()
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    Ok(svg)
}
