//! True wind angle and tack

use serde::{Deserialize, Serialize};

/// Side of the boat the wind comes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tack {
    Port,
    Starboard,
}

impl Tack {
    /// Port for TWA in (-180, 0] and for exactly 180, Starboard otherwise
    ///
    /// Both boundaries are a labelling convention: head to wind and dead
    /// downwind have no physical side.
    pub fn from_twa(twa: f64) -> Tack {
        if twa <= 0.0 || twa >= 180.0 {
            Tack::Port
        } else {
            Tack::Starboard
        }
    }
}

/// True wind angle in (-180, 180]
///
/// `heading` is degrees clockwise from true north in (-180, 180], `twd` is the
/// direction the wind blows from in [0, 360).
pub fn true_wind_angle(heading: f64, twd: f64) -> f64 {
    let heading = if heading < 0.0 {
        360.0 - heading.abs()
    } else {
        heading
    };

    let twa = heading - twd;
    if twa > 180.0 {
        twa - 360.0
    } else if twa <= -180.0 {
        twa + 360.0
    } else {
        twa
    }
}

/// TWA together with the tack it implies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindAngle {
    pub twa: f64,
    pub tack: Tack,
}

impl WindAngle {
    pub fn classify(heading: f64, twd: f64) -> WindAngle {
        let twa = true_wind_angle(heading, twd);
        WindAngle {
            twa,
            tack: Tack::from_twa(twa),
        }
    }
}
