//! Point of sail and manoeuvre detection
//!
//! Works on the ordered (tack, TWA) series of a track. Each step is compared
//! with the immediately preceding one only:
//!
//! | Tack changed | Before      | After       | Event    |
//! |--------------|-------------|-------------|----------|
//! | yes          | any         | \|TWA\| <= 90 | Tack     |
//! | yes          | any         | \|TWA\| > 90  | Gybe     |
//! | no           | \|TWA\| > 90  | \|TWA\| <= 90 | RoundUp  |
//! | no           | \|TWA\| <= 90 | \|TWA\| > 90  | BearAway |
//!
//! A tack change always wins over crossing the 90 degree line, so at most one
//! event fires per sample. The first sample never carries an event.

use serde::{Deserialize, Serialize};

use crate::track::{ClassifiedSample, EpochMillis};
use crate::wind::WindAngle;

/// Boundary between upwind and downwind sailing, degrees of |TWA|
pub const UPWIND_LIMIT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointOfSail {
    HeadToWind,
    Upwind,
    Reach,
    Downwind,
}

/// `(lower, upper, upper_inclusive, label)` over |TWA|, lower bounds inclusive
pub const POINT_OF_SAIL_TABLE: [(f64, f64, bool, PointOfSail); 4] = [
    (0.0, 30.0, false, PointOfSail::HeadToWind),
    (30.0, 60.0, false, PointOfSail::Upwind),
    (60.0, 95.0, false, PointOfSail::Reach),
    (95.0, 180.0, true, PointOfSail::Downwind),
];

impl PointOfSail {
    /// Bucket a TWA; `None` if |TWA| is outside [0, 180] or not a number
    pub fn from_twa(twa: f64) -> Option<PointOfSail> {
        let a = twa.abs();
        POINT_OF_SAIL_TABLE
            .iter()
            .find(|(lo, hi, hi_inclusive, _)| {
                a >= *lo && (a < *hi || (*hi_inclusive && a == *hi))
            })
            .map(|(_, _, _, label)| *label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Manoeuvre {
    #[default]
    None,
    Tack,
    Gybe,
    RoundUp,
    BearAway,
}

/// Streaming detector holding only the previous step
#[derive(Debug, Clone, Default)]
pub struct ManoeuvreDetector {
    previous: Option<WindAngle>,
}

impl ManoeuvreDetector {
    pub fn new() -> Self {
        ManoeuvreDetector::default()
    }

    pub fn step(&mut self, current: WindAngle) -> Manoeuvre {
        let event = match self.previous {
            None => Manoeuvre::None,
            Some(prev) => {
                let upwind_now = current.twa.abs() <= UPWIND_LIMIT;
                let upwind_before = prev.twa.abs() <= UPWIND_LIMIT;
                if prev.tack != current.tack {
                    if upwind_now {
                        Manoeuvre::Tack
                    } else {
                        Manoeuvre::Gybe
                    }
                } else if !upwind_before && upwind_now {
                    Manoeuvre::RoundUp
                } else if upwind_before && !upwind_now {
                    Manoeuvre::BearAway
                } else {
                    Manoeuvre::None
                }
            }
        };
        self.previous = Some(current);
        event
    }
}

/// Label a whole series
pub fn detect_manoeuvres(angles: &[WindAngle]) -> Vec<Manoeuvre> {
    let mut detector = ManoeuvreDetector::new();
    angles.iter().map(|a| detector.step(*a)).collect()
}

/// One manoeuvre in a classified track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManoeuvreEvent {
    /// Row in the classified table
    pub index: usize,
    pub utc_ms: EpochMillis,
    pub kind: Manoeuvre,
    pub twa_before: f64,
    pub twa_after: f64,
    pub sog: f64,
}

/// List the manoeuvres of a classified track in time order
pub fn summarise(rows: &[ClassifiedSample]) -> Vec<ManoeuvreEvent> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.manoeuvre != Manoeuvre::None)
        .map(|(index, row)| ManoeuvreEvent {
            index,
            utc_ms: row.utc_ms,
            kind: row.manoeuvre,
            // The first row never carries an event, so index >= 1
            twa_before: rows[index - 1].twa,
            twa_after: row.twa,
            sog: row.sog,
        })
        .collect()
}
