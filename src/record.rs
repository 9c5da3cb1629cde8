//! Module that contains all valid record types for this application.
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct representing one environmental sample as returned by the isensor API.
pub struct SensorRecord {
    /// Server-assigned record id, monotonically non-decreasing with the timestamp.
    pub id: i64,
    /// Temperature value in celsius.
    pub temperature: i32,
    /// Relative humidity value in percent.
    pub humidity: i32,
    /// Pressure value in the raw sensor unit.
    pub pressure: i32,
    /// UV irradiance value in the raw sensor unit.
    pub uv: i32,
    /// Timestamp the record was recorded, assigned by the server in UTC.
    #[serde(rename = "date")]
    pub timestamp: chrono::DateTime<Utc>,
}

/// Ordered sequence of samples as returned by one fetch.
///
/// Index 0 is the most recent sample, the last index the oldest.
pub type SensorSeries = Vec<SensorRecord>;
