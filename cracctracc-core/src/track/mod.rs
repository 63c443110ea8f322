//! Track data model and the two decoder front ends
//!
//! Both front ends produce a [`DecodedTrack`]: an ordered sequence of
//! [`Sample`]s with strictly increasing timestamps, plus whatever race-control
//! and wind records the source carries.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::kinematics::round_to;
use crate::manoeuvres::{Manoeuvre, PointOfSail};
use crate::protocol::vkx::{
    LinePositionRecord, RaceTimerEvent, RaceTimerRecord, ShiftAngleRecord,
};
use crate::wind::Tack;

pub mod gpx;
pub mod vkx;

/// UNIX epoch milliseconds, UTC
pub type EpochMillis = i64;

/// Input file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Vkx,
    Gpx,
}

impl SourceFormat {
    /// Pick a format from a file extension, case insensitive, with or without the dot
    pub fn from_extension(ext: &str) -> Option<SourceFormat> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "vkx" => Some(SourceFormat::Vkx),
            "gpx" => Some(SourceFormat::Gpx),
            _ => None,
        }
    }

    /// Device sources carry float jitter and get rounded on output
    pub fn needs_rounding(self) -> bool {
        self == SourceFormat::Vkx
    }
}

/// A bare position fix, as read from a GPX track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub utc_ms: EpochMillis,
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

/// One navigation fix
///
/// Angles are degrees clockwise from true north in (-180, 180], speed is in
/// knots, altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub utc_ms: EpochMillis,
    pub lat: f64,
    pub lon: f64,
    pub sog: f64,
    pub cog: f64,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
}

impl Sample {
    /// Copy with device jitter masked: 4 decimals, altitude 1 decimal
    pub fn rounded(&self) -> Sample {
        Sample {
            sog: round_to(self.sog, 4),
            cog: round_to(self.cog, 4),
            altitude: self.altitude.map(|a| round_to(a, 1)),
            heading: self.heading.map(|h| round_to(h, 4)),
            roll: self.roll.map(|r| round_to(r, 4)),
            pitch: self.pitch.map(|p| round_to(p, 4)),
            ..*self
        }
    }

    /// Heading used for wind angles, falling back to course over ground
    pub fn true_heading(&self) -> f64 {
        self.heading.unwrap_or(self.cog)
    }
}

/// Reject duplicate or out-of-order timestamps
pub fn check_monotonic(samples: &[Sample]) -> Result<()> {
    for (i, pair) in samples.windows(2).enumerate() {
        if pair[1].utc_ms <= pair[0].utc_ms {
            return Err(TrackError::NonMonotonicTimestamp {
                index: i + 1,
                previous: pair[0].utc_ms,
                current: pair[1].utc_ms,
            });
        }
    }
    Ok(())
}

/// Race start and end, either bound may be unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceWindow {
    pub start_ms: Option<EpochMillis>,
    pub end_ms: Option<EpochMillis>,
}

impl RaceWindow {
    pub fn contains(&self, utc_ms: EpochMillis) -> bool {
        self.start_ms.map_or(true, |s| utc_ms >= s) && self.end_ms.map_or(true, |e| utc_ms <= e)
    }

    pub fn is_open(&self) -> bool {
        self.start_ms.is_none() && self.end_ms.is_none()
    }

    /// Per side, `other` wins where it has a bound
    pub fn overridden_by(&self, other: &RaceWindow) -> RaceWindow {
        RaceWindow {
            start_ms: other.start_ms.or(self.start_ms),
            end_ms: other.end_ms.or(self.end_ms),
        }
    }
}

/// Race-control records in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceControl {
    pub timer_events: Vec<RaceTimerRecord>,
    pub line_positions: Vec<LinePositionRecord>,
    pub shift_angles: Vec<ShiftAngleRecord>,
}

impl RaceControl {
    /// Last RACE_START and last RACE_END seen
    ///
    /// A general recall restarts the sequence, so earlier starts are stale.
    pub fn race_window(&self) -> RaceWindow {
        let mut window = RaceWindow::default();
        for event in &self.timer_events {
            let Ok(utc_ms) = EpochMillis::try_from(event.utc_ms) else {
                log::warn!("Race timer time {} out of range, ignored", event.utc_ms);
                continue;
            };
            match event.event() {
                Some(RaceTimerEvent::RaceStart) => window.start_ms = Some(utc_ms),
                Some(RaceTimerEvent::RaceEnd) => window.end_ms = Some(utc_ms),
                _ => {}
            }
        }
        window
    }
}

/// Sparse wind observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub utc_ms: EpochMillis,
    pub speed_knots: f64,
    /// Degrees clockwise from true north, the direction the wind blows from
    pub direction: f64,
}

/// Output of either decoder front end
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub source: SourceFormat,
    pub samples: Vec<Sample>,
    pub race_control: RaceControl,
    pub wind: Vec<WindSample>,
}

impl DecodedTrack {
    /// First and last sample time, `None` for an empty track
    pub fn time_span(&self) -> Option<(EpochMillis, EpochMillis)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.utc_ms, last.utc_ms)),
            _ => None,
        }
    }
}

/// Decode a complete input with the front end for `format`
pub fn decode<R: std::io::Read>(
    format: SourceFormat,
    input: R,
    options: &vkx::VkxOptions,
) -> Result<DecodedTrack> {
    match format {
        SourceFormat::Vkx => vkx::decode_vkx(input, options),
        SourceFormat::Gpx => gpx::decode_gpx_reader(input),
    }
}

/// A sample with wind-relative classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSample {
    pub utc_ms: EpochMillis,
    pub lat: f64,
    pub lon: f64,
    pub sog: f64,
    pub cog: f64,
    pub heading: f64,
    pub altitude: Option<f64>,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
    pub twd: f64,
    pub tws: Option<f64>,
    pub twa: f64,
    pub tack: Tack,
    pub point_of_sail: PointOfSail,
    pub manoeuvre: Manoeuvre,
}
