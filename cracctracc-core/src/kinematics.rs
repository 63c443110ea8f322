//! Derived kinematics
//!
//! Speed and course over ground from successive positions (WGS-84 inverse
//! geodesic problem, Karney's algorithm), vessel attitude from orientation
//! quaternions, and the unit conventions shared by the rest of the crate:
//! angles in degrees clockwise from true north, speeds in knots.

use geographiclib_rs::{Geodesic, InverseGeodesic};
use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::track::{Sample, TrackPoint};

/// Metres per second to knots (1852 m per nautical mile)
pub const MS_TO_KN: f64 = 900.0 / 463.0;

pub fn ms_to_knots(speed: f64) -> f64 {
    speed * MS_TO_KN
}

/// Wrap an angle into (-180, 180]
pub fn wrap_180(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Wrap an angle into [0, 360)
pub fn wrap_360(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Round half away from zero to a number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Distance and initial bearing between two positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodesicLeg {
    pub distance_m: f64,
    /// Initial bearing, degrees clockwise from true north in (-180, 180]
    pub bearing: f64,
}

fn solve_inverse(geod: &Geodesic, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> GeodesicLeg {
    let (s12, azi1, _azi2, _a12): (f64, f64, f64, f64) = geod.inverse(lat1, lon1, lat2, lon2);
    GeodesicLeg {
        distance_m: s12,
        bearing: wrap_180(azi1),
    }
}

/// Solve the inverse geodesic problem on the WGS-84 ellipsoid
pub fn geodesic_inverse(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> GeodesicLeg {
    solve_inverse(&Geodesic::wgs84(), lat1, lon1, lat2, lon2)
}

/// Build samples from bare positions by differencing consecutive fixes
///
/// Each output sample describes the leg that ends at its position. The first
/// point has no predecessor and is dropped, so `n` points give `n - 1`
/// samples. Heading is taken to be the course over ground.
pub fn derive_from_positions(points: &[TrackPoint]) -> Result<Vec<Sample>> {
    let geod = Geodesic::wgs84();
    let mut samples = Vec::with_capacity(points.len().saturating_sub(1));

    for (index, pair) in points.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.utc_ms <= prev.utc_ms {
            return Err(TrackError::NonMonotonicTimestamp {
                index: index + 1,
                previous: prev.utc_ms,
                current: curr.utc_ms,
            });
        }
        let dt = (curr.utc_ms - prev.utc_ms) as f64 / 1000.0;
        let leg = solve_inverse(&geod, prev.lat, prev.lon, curr.lat, curr.lon);

        samples.push(Sample {
            utc_ms: curr.utc_ms,
            lat: curr.lat,
            lon: curr.lon,
            sog: ms_to_knots(leg.distance_m / dt),
            cog: leg.bearing,
            altitude: curr.altitude,
            heading: Some(leg.bearing),
            roll: None,
            pitch: None,
        });
    }

    log::debug!(
        "Derived {} samples from {} positions",
        samples.len(),
        points.len()
    );
    Ok(samples)
}

/// Vessel attitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    /// Heading, clockwise from true north in (-180, 180]
    pub yaw: f64,
}

// Collapse floating point noise so that a cosine term of "zero" does not
// come out as a tiny negative and flip atan2 by 180 degrees.
fn settle(value: f64) -> f64 {
    let r = round_to(value, 10);
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Euler angles from a unit orientation quaternion in the local NED frame
pub fn attitude_from_quaternion(q: &Quaternion<f64>) -> Attitude {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let roll = (2.0 * (w * x + y * z)).atan2(settle(1.0 - 2.0 * (x * x + y * y)));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(settle(1.0 - 2.0 * (y * y + z * z)));

    Attitude {
        roll: roll.to_degrees(),
        pitch: pitch.to_degrees(),
        yaw: yaw.to_degrees(),
    }
}
