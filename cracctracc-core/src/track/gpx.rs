//! XML front end: GPX track points to samples
//!
//! Only `trkpt` elements are read, matched by local name so that any
//! namespace prefix is accepted. Each point needs `lat`/`lon` attributes and a
//! `time` child; `ele` is optional. Speed and course are derived afterwards by
//! differencing consecutive points.

use std::io::Read;

use chrono::DateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackError};
use crate::kinematics::derive_from_positions;

use super::{DecodedTrack, RaceControl, SourceFormat, TrackPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Other,
    Time,
    Elevation,
}

#[derive(Debug, Default)]
struct PendingPoint {
    lat: f64,
    lon: f64,
    time: Option<i64>,
    altitude: Option<f64>,
}

fn parse_coordinate(index: usize, name: &str, value: &str, limit: f64) -> Result<f64> {
    let v: f64 = value.trim().parse().map_err(|_| TrackError::InvalidCoordinate {
        index,
        reason: format!("{} '{}' is not a number", name, value),
    })?;
    if !v.is_finite() || v.abs() > limit {
        return Err(TrackError::InvalidCoordinate {
            index,
            reason: format!("{} {} out of range", name, v),
        });
    }
    Ok(v)
}

fn start_point(index: usize, e: &BytesStart) -> Result<PendingPoint> {
    let mut lat = None;
    let mut lon = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TrackError::Xml(err.to_string()))?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate(index, "lat", &value, 90.0)?),
            b"lon" => lon = Some(parse_coordinate(index, "lon", &value, 180.0)?),
            _ => {}
        }
    }
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(PendingPoint {
            lat,
            lon,
            ..Default::default()
        }),
        _ => Err(TrackError::InvalidCoordinate {
            index,
            reason: "missing lat/lon attribute".to_string(),
        }),
    }
}

/// Parse ISO-8601 UTC time to epoch milliseconds
fn parse_time(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Read all track points in document order
pub fn parse_gpx(xml: &str) -> Result<Vec<TrackPoint>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut pending: Option<PendingPoint> = None;
    let mut field = Field::Other;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => pending = Some(start_point(points.len(), &e)?),
                b"time" if pending.is_some() => field = Field::Time,
                b"ele" if pending.is_some() => field = Field::Elevation,
                _ => field = Field::Other,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    // Self-closing point cannot carry a time child
                    start_point(points.len(), &e)?;
                    return Err(TrackError::MissingTimestamp {
                        index: points.len(),
                    });
                }
            }
            Event::Text(t) => {
                if let Some(point) = pending.as_mut() {
                    let text = t.unescape()?;
                    match field {
                        Field::Time => {
                            point.time = Some(parse_time(&text).ok_or(
                                TrackError::MissingTimestamp {
                                    index: points.len(),
                                },
                            )?)
                        }
                        Field::Elevation => point.altitude = text.trim().parse().ok(),
                        Field::Other => {}
                    }
                }
            }
            Event::End(e) => {
                field = Field::Other;
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some(point) = pending.take() {
                        let utc_ms = point.time.ok_or(TrackError::MissingTimestamp {
                            index: points.len(),
                        })?;
                        points.push(TrackPoint {
                            utc_ms,
                            lat: point.lat,
                            lon: point.lon,
                            altitude: point.altitude,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    log::debug!("GPX: {} track points", points.len());
    Ok(points)
}

/// Decode a GPX document into samples with derived speed and course
pub fn decode_gpx(xml: &str) -> Result<DecodedTrack> {
    let points = parse_gpx(xml)?;
    let samples = derive_from_positions(&points)?;
    Ok(DecodedTrack {
        source: SourceFormat::Gpx,
        samples,
        race_control: RaceControl::default(),
        wind: Vec::new(),
    })
}

pub fn decode_gpx_reader<R: Read>(mut input: R) -> Result<DecodedTrack> {
    let mut xml = String::new();
    input.read_to_string(&mut xml)?;
    decode_gpx(&xml)
}
