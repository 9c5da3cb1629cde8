//! Module for composing the projected sensor series into one PNG chart.
use std::io::Cursor;

use image::{ImageOutputFormat, RgbImage};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::projection::ScaleParameters;

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct modeling the parameters for chart rendering.
pub struct ChartParameters {
    /// Width of the rendered image in pixels.
    pub width: u32,
    /// Height of the rendered image in pixels.
    pub height: u32,
    /// Per-metric scale factors applied before plotting.
    pub scale: ScaleParameters,
}

/// One projected series together with its legend label.
#[derive(Debug, Clone)]
pub struct ProjectedSeries {
    pub name: &'static str,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not set up the chart: {0}")]
    Create(String),
    #[error("could not encode the chart image: {0}")]
    Encode(String),
}

/// Renders the given series on one shared pair of axes and encodes the result
/// as PNG bytes.
///
/// The image is drawn into an in-memory pixel buffer, so concurrent or rapid
/// successive requests never collide on a shared output file.
pub fn render_png(
    series_set: &[ProjectedSeries],
    params: &ChartParameters,
) -> Result<Vec<u8>, RenderError> {
    let (x_range, y_range) = axis_ranges(series_set);

    let mut pixels = vec![0u8; (params.width * params.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (params.width, params.height))
            .into_drawing_area();
        root.fill(&WHITE)
            .map_err(|err| RenderError::Create(err.to_string()))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|err| RenderError::Create(err.to_string()))?;

        chart
            .configure_mesh()
            .x_desc("sample")
            .draw()
            .map_err(|err| RenderError::Create(err.to_string()))?;

        for (index, series) in series_set.iter().enumerate() {
            let color = Palette99::pick(index).mix(0.9);
            let points = series
                .xs
                .iter()
                .zip(series.ys.iter())
                .map(|(x, y)| (*x, *y))
                .collect::<Vec<(f64, f64)>>();
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(|err| RenderError::Create(err.to_string()))?
                .label(series.name)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.filled())
                });
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|err| RenderError::Create(err.to_string()))?;

        root.present()
            .map_err(|err| RenderError::Create(err.to_string()))?;
    }

    let rgb = RgbImage::from_raw(params.width, params.height, pixels)
        .ok_or_else(|| RenderError::Encode(String::from("pixel buffer size mismatch")))?;

    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|err| RenderError::Encode(err.to_string()))?;
    Ok(png)
}

/// Computes the shared axis ranges covering every series.
///
/// Degenerate ranges are widened so that a one-point chart still renders.
fn axis_ranges(
    series_set: &[ProjectedSeries],
) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_max = 0.0f64;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for series in series_set {
        for x in &series.xs {
            x_max = x_max.max(*x);
        }
        for y in &series.ys {
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }
    if x_max <= 0.0 {
        x_max = 1.0;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }
    (0.0..x_max, y_min..y_max)
}
