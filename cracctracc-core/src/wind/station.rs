//! Weather-station wind history
//!
//! Parses the climate-graph JSON served for one station and one calendar day
//! and trims it to the span of a track. Fetching and caching the document is
//! left to the caller.

use serde::Deserialize;

use crate::error::{Result, TrackError};
use crate::track::{EpochMillis, WindSample};

/// Station speeds are km/h
pub const KMH_TO_KN: f64 = 0.54;

/// Observations kept either side of the track span
pub const DEFAULT_PADDING_MS: i64 = 1_800_000;

#[derive(Debug, Deserialize)]
struct StationResponse {
    data: StationData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationData {
    climate_graphs: ClimateGraphs,
}

#[derive(Debug, Deserialize)]
struct ClimateGraphs {
    #[serde(rename = "wind-speed")]
    wind_speed: Graph,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Graph {
    data_config: DataConfig,
}

#[derive(Debug, Deserialize)]
struct DataConfig {
    series: Series,
}

#[derive(Debug, Deserialize)]
struct Series {
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct Group {
    points: Vec<StationPoint>,
}

#[derive(Debug, Deserialize)]
struct StationPoint {
    /// Station local time, epoch seconds
    x: f64,
    /// km/h
    y: Option<f64>,
    direction: Option<f64>,
}

/// Station local seconds to UTC milliseconds, `None` if out of range
fn station_time_to_utc_ms(x: f64, utc_offset_secs: i64) -> Option<EpochMillis> {
    if !x.is_finite() || x < i64::MIN as f64 || x >= i64::MAX as f64 {
        return None;
    }
    (x as i64).checked_sub(utc_offset_secs)?.checked_mul(1000)
}

/// Parse a station response body into UTC wind samples
///
/// `utc_offset_secs` is the station's offset from UTC; station times are
/// local, so it is subtracted.
pub fn parse_station_response(body: &str, utc_offset_secs: i64) -> Result<Vec<WindSample>> {
    let response: StationResponse =
        serde_json::from_str(body).map_err(|e| TrackError::WindFormat(e.to_string()))?;

    let group = response
        .data
        .climate_graphs
        .wind_speed
        .data_config
        .series
        .groups
        .into_iter()
        .next()
        .ok_or_else(|| TrackError::WindFormat("no wind-speed series groups".to_string()))?;

    let mut samples = Vec::with_capacity(group.points.len());
    for point in group.points {
        match (point.y, point.direction) {
            (Some(speed), Some(direction)) => {
                let utc_ms = station_time_to_utc_ms(point.x, utc_offset_secs).ok_or_else(|| {
                    TrackError::WindFormat(format!("station time {} out of range", point.x))
                })?;
                samples.push(WindSample {
                    utc_ms,
                    speed_knots: speed * KMH_TO_KN,
                    direction,
                })
            }
            _ => log::debug!("Station point at {} has no wind reading, skipped", point.x),
        }
    }
    Ok(samples)
}

/// Keep samples within `[start - padding, end + padding]`, inclusive
pub fn filter_wind_data(
    samples: &[WindSample],
    start_ms: EpochMillis,
    end_ms: EpochMillis,
    padding_ms: i64,
) -> Vec<WindSample> {
    let (lo, hi) = (start_ms.saturating_sub(padding_ms), end_ms.saturating_add(padding_ms));
    samples
        .iter()
        .filter(|s| s.utc_ms >= lo && s.utc_ms <= hi)
        .copied()
        .collect()
}
