//! Binary front end: route VKX records into samples, race control and wind

use std::collections::HashMap;
use std::io::Read;

use crate::error::{Result, TrackError};
use crate::kinematics::{attitude_from_quaternion, ms_to_knots, wrap_180};
use crate::protocol::vkx::{PositionRecord, RawRecord, Record, RecordReader, WindRecord};

use super::{
    check_monotonic, DecodedTrack, EpochMillis, RaceControl, Sample, SourceFormat, WindSample,
};

/// Options for the binary decoder
#[derive(Debug, Clone, Default)]
pub struct VkxOptions {
    /// Explicit payload lengths for tags the codec does not know
    pub fallback_lengths: HashMap<u8, usize>,
}

/// Device time as a signed epoch, rejected above `i64::MAX`
fn epoch_millis(raw: &RawRecord, utc_ms: u64) -> Result<EpochMillis> {
    EpochMillis::try_from(utc_ms).map_err(|_| TrackError::TimestampOutOfRange {
        tag: raw.tag.as_u8(),
        offset: raw.offset,
        value: utc_ms,
    })
}

fn sample_from_position(p: &PositionRecord, utc_ms: EpochMillis) -> Sample {
    let attitude = attitude_from_quaternion(&p.orientation());
    Sample {
        utc_ms,
        lat: p.latitude(),
        lon: p.longitude(),
        sog: ms_to_knots(p.sog_ms as f64),
        cog: wrap_180((p.cog_rad as f64).to_degrees()),
        altitude: Some(p.altitude_m as f64),
        heading: Some(attitude.yaw),
        roll: Some(attitude.roll),
        pitch: Some(attitude.pitch),
    }
}

fn wind_from_record(w: &WindRecord, utc_ms: EpochMillis) -> WindSample {
    WindSample {
        utc_ms,
        speed_knots: ms_to_knots(w.speed_ms as f64),
        direction: w.direction as f64,
    }
}

/// Decode a complete VKX stream
pub fn decode_vkx<R: Read>(input: R, options: &VkxOptions) -> Result<DecodedTrack> {
    let mut reader =
        RecordReader::new(input).with_fallback_lengths(options.fallback_lengths.clone());

    let mut samples = Vec::new();
    let mut race_control = RaceControl::default();
    let mut wind = Vec::new();
    let mut discarded = 0usize;

    for raw in reader.by_ref() {
        let raw = raw?;
        match raw.decode()? {
            Record::Position(p) => {
                let utc_ms = epoch_millis(&raw, p.utc_ms)?;
                samples.push(sample_from_position(&p, utc_ms))
            }
            Record::RaceTimer(t) => {
                epoch_millis(&raw, t.utc_ms)?;
                race_control.timer_events.push(t)
            }
            Record::LinePosition(l) => race_control.line_positions.push(l),
            Record::ShiftAngle(s) => race_control.shift_angles.push(s),
            Record::Wind(w) => {
                let utc_ms = epoch_millis(&raw, w.utc_ms)?;
                wind.push(wind_from_record(&w, utc_ms))
            }
            _ => discarded += 1,
        }
    }

    log::debug!(
        "VKX: {} bytes, {} positions, {} timer events, {} wind records, {} other, {} skipped",
        reader.offset(),
        samples.len(),
        race_control.timer_events.len(),
        wind.len(),
        discarded,
        reader.skipped()
    );

    check_monotonic(&samples)?;

    Ok(DecodedTrack {
        source: SourceFormat::Vkx,
        samples,
        race_control,
        wind,
    })
}
