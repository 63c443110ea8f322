//! Track assembly
//!
//! Composes the pipeline stages over one decoded track:
//!
//! ```text
//! DecodedTrack -> trim to race window -> round (device sources)
//!              -> evaluate wind -> TWA / tack -> point of sail -> manoeuvres
//! ```
//!
//! Each stage produces new values; nothing is updated in place.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cracctracc_core::{AssemblerConfig, TrackAssembler, WindField};
//!
//! let mut assembler = TrackAssembler::new(AssemblerConfig::default())?;
//! let track = assembler.assemble(decoded, &WindField::fixed(225.0))?;
//! for event in &track.manoeuvres {
//!     println!("{:?} at {}", event.kind, event.utc_ms);
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::kinematics::round_to;
use crate::manoeuvres::{summarise, ManoeuvreDetector, ManoeuvreEvent, PointOfSail};
use crate::track::{
    ClassifiedSample, DecodedTrack, EpochMillis, RaceWindow, Sample, SourceFormat,
};
use crate::wind::{Tack, WindAngle, WindEstimate, WindField};

/// Smallest and largest 13 digit millisecond timestamps
const MIN_EPOCH_MILLIS: i64 = 1_000_000_000_000;
const MAX_EPOCH_MILLIS: i64 = 9_999_999_999_999;

/// Check that a caller-supplied bound is a 13 digit UNIX millisecond value
pub fn validate_epoch_millis(value: i64) -> Result<EpochMillis> {
    if (MIN_EPOCH_MILLIS..=MAX_EPOCH_MILLIS).contains(&value) {
        Ok(value)
    } else {
        Err(TrackError::InvalidRaceWindow { value })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblerConfig {
    /// Overrides the device race start, UNIX ms
    pub race_start: Option<EpochMillis>,
    /// Overrides the device race end, UNIX ms
    pub race_end: Option<EpochMillis>,
}

impl AssemblerConfig {
    fn user_window(&self) -> Result<RaceWindow> {
        Ok(RaceWindow {
            start_ms: self.race_start.map(validate_epoch_millis).transpose()?,
            end_ms: self.race_end.map(validate_epoch_millis).transpose()?,
        })
    }
}

/// Identifier of one assembled track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// Hands out increasing identifiers, starting at 1
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    next: u32,
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        SequenceGenerator { next: 1 }
    }
}

impl SequenceGenerator {
    pub fn new() -> Self {
        SequenceGenerator::default()
    }

    pub fn next_id(&mut self) -> TrackId {
        let id = TrackId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Fully classified track, ready for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledTrack {
    pub id: TrackId,
    pub source: SourceFormat,
    /// Window the rows were trimmed to
    pub race_window: RaceWindow,
    pub rows: Vec<ClassifiedSample>,
    pub manoeuvres: Vec<ManoeuvreEvent>,
}

pub struct TrackAssembler {
    user_window: RaceWindow,
    ids: SequenceGenerator,
}

impl TrackAssembler {
    /// Fails with `InvalidRaceWindow` if a configured bound is not 13 digits
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        let user_window = config.user_window()?;
        Ok(TrackAssembler {
            user_window,
            ids: SequenceGenerator::new(),
        })
    }

    /// Device window with configured bounds taking precedence per side
    pub fn race_window(&self, track: &DecodedTrack) -> RaceWindow {
        track
            .race_control
            .race_window()
            .overridden_by(&self.user_window)
    }

    pub fn assemble(&mut self, track: DecodedTrack, wind: &WindField) -> Result<AssembledTrack> {
        let race_window = self.race_window(&track);
        let rounding = track.source.needs_rounding();

        let samples = trim(track.samples, &race_window);
        let samples: Vec<Sample> = if rounding {
            samples.iter().map(Sample::rounded).collect()
        } else {
            samples
        };

        let times: Vec<EpochMillis> = samples.iter().map(|s| s.utc_ms).collect();
        let estimates = wind.evaluate(&times);

        let rows = classify(&samples, &estimates, rounding)?;
        let manoeuvres = summarise(&rows);

        let id = self.ids.next_id();
        log::info!(
            "{}: {} rows, {} manoeuvres, window {:?}..{:?}",
            id,
            rows.len(),
            manoeuvres.len(),
            race_window.start_ms,
            race_window.end_ms
        );

        Ok(AssembledTrack {
            id,
            source: track.source,
            race_window,
            rows,
            manoeuvres,
        })
    }
}

fn trim(samples: Vec<Sample>, window: &RaceWindow) -> Vec<Sample> {
    if window.is_open() {
        return samples;
    }
    let before = samples.len();
    let kept: Vec<Sample> = samples
        .into_iter()
        .filter(|s| window.contains(s.utc_ms))
        .collect();
    if kept.is_empty() && before > 0 {
        log::warn!("Race window {:?} excludes every sample", window);
    } else {
        log::debug!("Trimmed {} of {} samples", before - kept.len(), before);
    }
    kept
}

fn wind_angle(heading: f64, twd: f64, rounding: bool) -> WindAngle {
    let angle = WindAngle::classify(heading, twd);
    if rounding {
        let twa = round_to(angle.twa, 4);
        WindAngle {
            twa,
            tack: Tack::from_twa(twa),
        }
    } else {
        angle
    }
}

fn classify(
    samples: &[Sample],
    estimates: &[WindEstimate],
    rounding: bool,
) -> Result<Vec<ClassifiedSample>> {
    let mut detector = ManoeuvreDetector::new();
    let mut rows = Vec::with_capacity(samples.len());

    for (index, (sample, estimate)) in samples.iter().zip(estimates).enumerate() {
        let heading = sample.true_heading();
        let angle = wind_angle(heading, estimate.twd, rounding);
        let point_of_sail =
            PointOfSail::from_twa(angle.twa).ok_or_else(|| TrackError::InvalidCoordinate {
                index,
                reason: format!("heading {} gives no wind angle", heading),
            })?;
        let tws = if rounding {
            estimate.tws.map(|t| round_to(t, 4))
        } else {
            estimate.tws
        };

        rows.push(ClassifiedSample {
            utc_ms: sample.utc_ms,
            lat: sample.lat,
            lon: sample.lon,
            sog: sample.sog,
            cog: sample.cog,
            heading,
            altitude: sample.altitude,
            roll: sample.roll,
            pitch: sample.pitch,
            twd: estimate.twd,
            tws,
            twa: angle.twa,
            tack: angle.tack,
            point_of_sail,
            manoeuvre: detector.step(angle),
        });
    }
    Ok(rows)
}
