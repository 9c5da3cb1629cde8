//! Module for rendering sensor series as human readable reply text.
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::record::SensorSeries;

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct modeling the parameters for reply formatting.
pub struct FormatParameters {
    /// IANA name of the time zone used for human readable timestamps.
    /// Falls back to the original UTC timestamps if the name is unknown.
    pub display_timezone: String,
}

/// Renders the current status reply from the most recent sample.
///
/// Produces five lines: one per metric, glyph prefixed and unit suffixed, and
/// a last-update line. The series must hold at least one record; the client
/// reports an empty response as a fetch error before this is reached.
pub fn format_status(series: &SensorSeries, params: &FormatParameters) -> String {
    let current = &series[0];
    format!(
        "🌡️{} °C\n💧{} %\n🌎{} Pa\n☀️{} W/m²\nLast update: {}",
        current.temperature,
        current.humidity,
        current.pressure,
        current.uv,
        display_time(&current.timestamp, params, "%d %b %y at %H:%M")
    )
}

/// Renders the caption for a chart of `points` samples.
///
/// The boundaries are taken literally from the first and last element of the
/// series, which the API orders newest first. The label still reads
/// "From ... to ...", matching the historical behavior of the bot.
pub fn format_time_range(series: &SensorSeries, points: usize, params: &FormatParameters) -> String {
    format!(
        "Last {} updates\nFrom {} to {}",
        points,
        display_time(&series[0].timestamp, params, "%d %b %y %H:%M"),
        display_time(&series[points - 1].timestamp, params, "%d %b %y %H:%M")
    )
}

fn display_time(timestamp: &DateTime<Utc>, params: &FormatParameters, pattern: &str) -> String {
    match params.display_timezone.parse::<Tz>() {
        Ok(zone) => timestamp.with_timezone(&zone).format(pattern).to_string(),
        Err(_) => {
            log::warn!(target: "isensor::format", "Unknown display time zone: '{}'", params.display_timezone);
            timestamp.format(pattern).to_string()
        }
    }
}
