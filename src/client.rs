//! Module for fetching sensor records from the isensor HTTP API.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::SensorSeries;

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct modeling the parameters required for the sensor API connection.
pub struct ClientParameters {
    /// Base endpoint of the sensor data API, queried as `{endpoint}?limit={n}`.
    pub endpoint: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not reach the sensor api: {0}")]
    Network(#[source] reqwest::Error),
    #[error("could not read the sensor api response: {0}")]
    Read(#[source] reqwest::Error),
    #[error("could not deserialize the sensor api response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("the sensor api returned no records")]
    NoData,
}

/// Fetches the `limit` most recent sensor records.
///
/// The limit is passed straight through as a query parameter, trusting the
/// server to honor it. Any HTTP response is read and decoded as is, without a
/// separate status check. No retries are attempted.
///
/// # Arguments
///
/// * `http` - The HTTP client to issue the request on.
///
/// * `params` - Parameters for the sensor API connection.
///
/// * `limit` - Number of most recent records to request.
///
/// # Returns
///
/// * `Ok(series)` - The decoded records, newest first, at least one element.
///
/// * `Err(...)` - If the transport call, the body read or the decode fails, or
///     the server returned an empty array.
///
pub async fn fetch(
    http: &reqwest::Client,
    params: &ClientParameters,
    limit: u32,
) -> Result<SensorSeries, FetchError> {
    let response = http
        .get(&params.endpoint)
        .query(&[("limit", limit)])
        .send()
        .await
        .map_err(FetchError::Network)?;

    let body = response.text().await.map_err(FetchError::Read)?;

    log::debug!(target: "isensor::client", "Received sensor api response with length: '{}'!", body.len());

    parse_series(body.as_str())
}

/// Decodes one sensor API response body into a series.
///
/// An empty array is reported as `FetchError::NoData` so that callers never
/// index into a zero-length series.
pub fn parse_series(body: &str) -> Result<SensorSeries, FetchError> {
    let series = serde_json::from_str::<SensorSeries>(body).map_err(FetchError::Decode)?;
    if series.is_empty() {
        return Err(FetchError::NoData);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_body() {
        let body = r#"[{"id": 1, "temperature": 20, "humidity": 45, "pressure": 10130, "uv": 1, "date": "2023-03-05T13:30:00Z"}]"#;
        let series = parse_series(body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].temperature, 20);
    }

    #[test]
    fn rejects_malformed_body() {
        let err = parse_series("not json").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn rejects_schema_mismatch() {
        let err = parse_series(r#"[{"id": "not-a-number"}]"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn rejects_empty_array() {
        let err = parse_series("[]").unwrap_err();
        assert!(matches!(err, FetchError::NoData));
    }

    #[tokio::test]
    async fn reports_unreachable_api_as_network_error() {
        let params = ClientParameters {
            // Port 9 (discard) on localhost, nothing listens there.
            endpoint: String::from("http://127.0.0.1:9/data"),
        };
        let http = reqwest::Client::new();
        let err = fetch(&http, &params, 5).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
