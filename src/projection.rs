//! Module for projecting a sensor series into per-metric plot coordinates.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{SensorRecord, SensorSeries};

/// One of the four plotted sensor metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
    Uv,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure => "pressure",
            Metric::Uv => "uv",
        }
    }

    fn raw_value(&self, record: &SensorRecord) -> f64 {
        match self {
            Metric::Temperature => f64::from(record.temperature),
            Metric::Humidity => f64::from(record.humidity),
            Metric::Pressure => f64::from(record.pressure),
            Metric::Uv => f64::from(record.uv),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Per-metric scale factors applied to the raw sensor values before plotting.
///
/// The upstream sensor feed does not document its units, and historical
/// deployments disagreed on two of them: pressure was plotted divided by ten
/// (factor 0.1) and uv was plotted either raw (factor 1.0) or times ten
/// (factor 10.0). The factors are therefore configuration values rather than
/// constants in code.
pub struct ScaleParameters {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub uv: f64,
}

impl ScaleParameters {
    pub fn factor(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Pressure => self.pressure,
            Metric::Uv => self.uv,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("series holds {got} records but {requested} points were requested")]
    InsufficientData { requested: usize, got: usize },
}

/// Extracts the `(xs, ys)` coordinate arrays for one metric.
///
/// The x axis is the sample ordinal (`xs[i] = i`), not real time. The y values
/// are the raw metric values scaled by the metric's configured factor.
///
/// # Arguments
///
/// * `series` - The fetched series, newest first.
///
/// * `metric` - The metric to extract.
///
/// * `points` - Number of points to project; the series must hold at least
///     this many records.
///
/// * `scale` - The configured per-metric scale factors.
///
/// # Returns
///
/// * `Ok((xs, ys))` - Two arrays of `points` elements each.
///
/// * `Err(...)` - If the series holds fewer than `points` records.
///
pub fn project(
    series: &SensorSeries,
    metric: Metric,
    points: usize,
    scale: &ScaleParameters,
) -> Result<(Vec<f64>, Vec<f64>), ProjectionError> {
    if series.len() < points {
        return Err(ProjectionError::InsufficientData {
            requested: points,
            got: series.len(),
        });
    }

    let factor = scale.factor(metric);
    let xs = (0..points).map(|i| i as f64).collect();
    let ys = series
        .iter()
        .take(points)
        .map(|record| metric.raw_value(record) * factor)
        .collect();
    Ok((xs, ys))
}
