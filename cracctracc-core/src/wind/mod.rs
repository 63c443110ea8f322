//! True wind: angle classification and per-sample wind estimates
//!
//! - **angle**: TWA and tack from heading and TWD
//! - **interpolate**: linear and angular interpolation of sparse series
//! - **station**: weather-station history parsing and trimming

mod angle;
pub mod interpolate;
pub mod station;

pub use angle::{true_wind_angle, Tack, WindAngle};
pub use interpolate::{angular_interpolation, interp};

use crate::error::{Result, TrackError};
use crate::kinematics::wrap_360;
use crate::track::{EpochMillis, WindSample};

/// Wind at one sample time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindEstimate {
    /// Degrees, [0, 360)
    pub twd: f64,
    /// Knots, unknown for a fixed direction
    pub tws: Option<f64>,
}

/// Where the true wind for a track comes from
#[derive(Debug, Clone, PartialEq)]
pub enum WindField {
    /// One direction for the whole track
    Fixed { twd: f64 },
    /// Time series, increasing and non-empty
    Series(Vec<WindSample>),
}

impl WindField {
    pub fn fixed(twd: f64) -> WindField {
        WindField::Fixed { twd: wrap_360(twd) }
    }

    /// Build a series field; samples are sorted and duplicate times dropped
    pub fn from_samples(mut samples: Vec<WindSample>) -> Result<WindField> {
        samples.sort_by_key(|s| s.utc_ms);
        samples.dedup_by_key(|s| s.utc_ms);
        if samples.is_empty() {
            return Err(TrackError::MissingWindData(
                "wind series is empty".to_string(),
            ));
        }
        Ok(WindField::Series(samples))
    }

    /// Fall back to a fixed direction when no wind data could be found
    ///
    /// Only `MissingWindData` degrades; any other failure is passed on.
    pub fn or_fixed(series: Result<WindField>, twd: f64) -> Result<WindField> {
        match series {
            Ok(field) => Ok(field),
            Err(TrackError::MissingWindData(reason)) => {
                log::warn!("{}", reason);
                log::warn!("TWD set statically at {} degrees!", twd);
                Ok(WindField::fixed(twd))
            }
            Err(e) => Err(e),
        }
    }

    /// Wind estimates for each time, in order
    pub fn evaluate(&self, times: &[EpochMillis]) -> Vec<WindEstimate> {
        match self {
            WindField::Fixed { twd } => times
                .iter()
                .map(|_| WindEstimate {
                    twd: *twd,
                    tws: None,
                })
                .collect(),
            WindField::Series(samples) => {
                let x: Vec<f64> = times.iter().map(|&t| t as f64).collect();
                let xp: Vec<f64> = samples.iter().map(|s| s.utc_ms as f64).collect();
                let dir: Vec<f64> = samples.iter().map(|s| s.direction).collect();
                let speed: Vec<f64> = samples.iter().map(|s| s.speed_knots).collect();

                angular_interpolation(&x, &xp, &dir, 360.0)
                    .into_iter()
                    .zip(x.iter())
                    .map(|(twd, &xi)| WindEstimate {
                        twd: wrap_360(twd),
                        tws: Some(interp(xi, &xp, &speed)),
                    })
                    .collect()
            }
        }
    }
}
