//! Vakaros VKX record codec
//!
//! A VKX file is a flat sequence of records. Each record is a one byte tag
//! followed by a fixed-length, little-endian payload whose layout depends only
//! on the tag. There is no length prefix, so the tag table below is the only
//! way to find the start of the next record.
//!
//! | Tag  | Record                          | Payload bytes |
//! |------|---------------------------------|---------------|
//! | 0xFF | Page header                     | 7             |
//! | 0xFE | Page terminator                 | 2             |
//! | 0x02 | Position, velocity, orientation | 44            |
//! | 0x03 | Declination                     | 20            |
//! | 0x04 | Race timer event                | 13            |
//! | 0x05 | Line position                   | 17            |
//! | 0x06 | Shift angle                     | 18            |
//! | 0x08 | Device configuration            | 13            |
//! | 0x0A | Wind data                       | 16            |
//! | 0x01 | Internal message                | 32            |
//! | 0x07 | Internal message                | 12            |
//! | 0x0E | Internal message                | 16            |
//! | 0x20 | Internal message                | 13            |
//!
//! [`RecordReader`] only frames records; [`RawRecord::decode`] turns a framed
//! payload into a typed [`Record`]. Routing records into samples is the job of
//! [`crate::track::vkx`].

use std::collections::HashMap;
use std::io::{ErrorKind, Read};

use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

// =============================================================================
// Tag table
// =============================================================================

/// Known VKX record tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordTag {
    PageHeader = 0xFF,
    PageTerminator = 0xFE,
    Position = 0x02,
    Declination = 0x03,
    RaceTimer = 0x04,
    LinePosition = 0x05,
    ShiftAngle = 0x06,
    DeviceConfig = 0x08,
    WindData = 0x0A,
    Internal01 = 0x01,
    Internal07 = 0x07,
    Internal0E = 0x0E,
    Internal20 = 0x20,
}

/// Tag -> payload length, in file order of the device documentation
pub const RECORD_TABLE: [(RecordTag, usize); 13] = [
    (RecordTag::PageHeader, 7),
    (RecordTag::PageTerminator, 2),
    (RecordTag::Position, 44),
    (RecordTag::Declination, 20),
    (RecordTag::RaceTimer, 13),
    (RecordTag::LinePosition, 17),
    (RecordTag::ShiftAngle, 18),
    (RecordTag::DeviceConfig, 13),
    (RecordTag::WindData, 16),
    (RecordTag::Internal01, 32),
    (RecordTag::Internal07, 12),
    (RecordTag::Internal0E, 16),
    (RecordTag::Internal20, 13),
];

impl RecordTag {
    pub fn from_u8(tag: u8) -> Option<RecordTag> {
        RECORD_TABLE
            .iter()
            .find(|(t, _)| *t as u8 == tag)
            .map(|(t, _)| *t)
    }

    /// Exact payload length following the tag byte
    pub fn payload_len(self) -> usize {
        RECORD_TABLE
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, len)| *len)
            .unwrap_or(0)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Payload layouts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageHeader {
    pub version: u8,
    pub reserved: [u8; 6],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageTerminator {
    pub page_length: u16,
}

/// Position, velocity and orientation (tag 0x02)
///
/// Latitude and longitude are fixed point, 1e-7 degrees. Course is in radians,
/// speed in m/s. The quaternion is the device orientation in the local
/// North-East-Down frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub utc_ms: u64,
    pub lat_e7: i32,
    pub lon_e7: i32,
    pub cog_rad: f32,
    pub sog_ms: f32,
    pub altitude_m: f32,
    pub qw: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
}

impl PositionRecord {
    pub fn latitude(&self) -> f64 {
        self.lat_e7 as f64 / 1e7
    }

    pub fn longitude(&self) -> f64 {
        self.lon_e7 as f64 / 1e7
    }

    pub fn orientation(&self) -> Quaternion<f64> {
        Quaternion::new(
            self.qw as f64,
            self.qx as f64,
            self.qy as f64,
            self.qz as f64,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeclinationRecord {
    pub utc_ms: u64,
    pub declination: f32,
    pub lat_e7: i32,
    pub lon_e7: i32,
}

/// Race timer event codes carried by tag 0x04
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaceTimerEvent {
    Reset = 0,
    Start = 1,
    Sync = 2,
    RaceStart = 3,
    RaceEnd = 4,
}

impl RaceTimerEvent {
    pub fn from_u8(code: u8) -> Option<RaceTimerEvent> {
        match code {
            0 => Some(RaceTimerEvent::Reset),
            1 => Some(RaceTimerEvent::Start),
            2 => Some(RaceTimerEvent::Sync),
            3 => Some(RaceTimerEvent::RaceStart),
            4 => Some(RaceTimerEvent::RaceEnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceTimerRecord {
    pub utc_ms: u64,
    pub code: u8,
    pub timer_sec: i32,
}

impl RaceTimerRecord {
    pub fn event(&self) -> Option<RaceTimerEvent> {
        RaceTimerEvent::from_u8(self.code)
    }
}

/// Start line end ping (tag 0x05)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePositionRecord {
    pub utc_ms: u64,
    pub line_end: u8,
    pub lat_e7: i32,
    pub lon_e7: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftAngleRecord {
    pub utc_ms: u64,
    pub tack: u8,
    pub manual: u8,
    pub true_heading: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfigRecord {
    pub utc_ms: u64,
    pub reserved: [u8; 4],
    pub config: u8,
}

/// Wind data (tag 0x0A), speed in m/s, direction in degrees from true north
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindRecord {
    pub utc_ms: u64,
    pub speed_ms: f32,
    pub direction: f32,
}

/// A decoded record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    PageHeader(PageHeader),
    PageTerminator(PageTerminator),
    Position(PositionRecord),
    Declination(DeclinationRecord),
    RaceTimer(RaceTimerRecord),
    LinePosition(LinePositionRecord),
    ShiftAngle(ShiftAngleRecord),
    DeviceConfig(DeviceConfigRecord),
    Wind(WindRecord),
    /// Internal device message, padding only
    Internal(RecordTag),
}

// =============================================================================
// Framing
// =============================================================================

/// One framed record: tag, stream offset of the tag byte, raw payload
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub tag: RecordTag,
    pub offset: u64,
    pub payload: Vec<u8>,
}

impl RawRecord {
    /// Interpret the payload according to the tag's layout
    pub fn decode(&self) -> Result<Record> {
        let p = &self.payload[..];
        let record = match self.tag {
            RecordTag::PageHeader => Record::PageHeader(bincode::deserialize(p)?),
            RecordTag::PageTerminator => Record::PageTerminator(bincode::deserialize(p)?),
            RecordTag::Position => Record::Position(bincode::deserialize(p)?),
            RecordTag::Declination => Record::Declination(bincode::deserialize(p)?),
            RecordTag::RaceTimer => Record::RaceTimer(bincode::deserialize(p)?),
            RecordTag::LinePosition => Record::LinePosition(bincode::deserialize(p)?),
            RecordTag::ShiftAngle => Record::ShiftAngle(bincode::deserialize(p)?),
            RecordTag::DeviceConfig => Record::DeviceConfig(bincode::deserialize(p)?),
            RecordTag::WindData => Record::Wind(bincode::deserialize(p)?),
            tag => Record::Internal(tag),
        };
        Ok(record)
    }
}

/// Serialize a payload with its tag byte in front, in VKX wire layout
pub fn encode_record<T: Serialize>(tag: RecordTag, payload: &T) -> Result<Vec<u8>> {
    let mut out = vec![tag.as_u8()];
    out.extend(bincode::serialize(payload)?);
    Ok(out)
}

/// Lazy, single pass record framer over any byte stream
///
/// Yields records strictly in stream order. After the first error the reader
/// is exhausted; there is no attempt to find the next tag.
pub struct RecordReader<R> {
    inner: R,
    offset: u64,
    fallback_lengths: HashMap<u8, usize>,
    reported_unknown: [bool; 256],
    skipped: u64,
    finished: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        RecordReader {
            inner,
            offset: 0,
            fallback_lengths: HashMap::new(),
            reported_unknown: [false; 256],
            skipped: 0,
            finished: false,
        }
    }

    /// Payload lengths for tags missing from [`RECORD_TABLE`]
    ///
    /// Records with these tags are skipped with a warning instead of failing
    /// the stream. Entries for known tags are ignored.
    pub fn with_fallback_lengths(mut self, lengths: HashMap<u8, usize>) -> Self {
        self.fallback_lengths = lengths;
        self
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of unknown records skipped through the fallback table
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    // Read until `buf` is full or the stream ends, returning the byte count
    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    fn read_payload(&mut self, tag: u8, tag_offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; len];
        let available = self.fill(&mut payload)?;
        if available < len {
            return Err(TrackError::TruncatedStream {
                tag,
                offset: tag_offset,
                expected: len,
                available,
            });
        }
        Ok(payload)
    }

    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        loop {
            let tag_offset = self.offset;
            let mut tag_buf = [0u8; 1];
            if self.fill(&mut tag_buf)? == 0 {
                return Ok(None);
            }
            let tag = tag_buf[0];

            if let Some(known) = RecordTag::from_u8(tag) {
                let payload = self.read_payload(tag, tag_offset, known.payload_len())?;
                return Ok(Some(RawRecord {
                    tag: known,
                    offset: tag_offset,
                    payload,
                }));
            }

            match self.fallback_lengths.get(&tag).copied() {
                Some(len) => {
                    if !self.reported_unknown[tag as usize] {
                        self.reported_unknown[tag as usize] = true;
                        log::warn!(
                            "Unknown record tag 0x{:02x} at offset {}, skipping {} bytes per fallback table",
                            tag,
                            tag_offset,
                            len
                        );
                    }
                    self.read_payload(tag, tag_offset, len)?;
                    self.skipped += 1;
                }
                None => {
                    return Err(TrackError::MalformedRecord {
                        tag,
                        offset: tag_offset,
                    });
                }
            }
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> PositionRecord {
        PositionRecord {
            utc_ms: 1697854013769,
            lat_e7: -338022350,
            lon_e7: 1512831650,
            cog_rad: 4.424224,
            sog_ms: 4.1661,
            altitude_m: 15.4,
            qw: 0.36210424,
            qx: -0.36216736,
            qy: -0.1270797,
            qz: -0.84944737,
        }
    }

    #[test]
    fn test_payload_sizes_match_table() {
        let header = PageHeader {
            version: 1,
            reserved: [0; 6],
        };
        assert_eq!(
            bincode::serialize(&header).unwrap().len(),
            RecordTag::PageHeader.payload_len()
        );
        assert_eq!(
            bincode::serialize(&position()).unwrap().len(),
            RecordTag::Position.payload_len()
        );
        let timer = RaceTimerRecord {
            utc_ms: 0,
            code: 3,
            timer_sec: 0,
        };
        assert_eq!(
            bincode::serialize(&timer).unwrap().len(),
            RecordTag::RaceTimer.payload_len()
        );
        let wind = WindRecord {
            utc_ms: 0,
            speed_ms: 0.0,
            direction: 0.0,
        };
        assert_eq!(
            bincode::serialize(&wind).unwrap().len(),
            RecordTag::WindData.payload_len()
        );
        let shift = ShiftAngleRecord {
            utc_ms: 0,
            tack: 0,
            manual: 0,
            true_heading: 0.0,
            speed: 0.0,
        };
        assert_eq!(
            bincode::serialize(&shift).unwrap().len(),
            RecordTag::ShiftAngle.payload_len()
        );
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(RecordTag::from_u8(0x02), Some(RecordTag::Position));
        assert_eq!(RecordTag::from_u8(0x0A), Some(RecordTag::WindData));
        assert_eq!(RecordTag::from_u8(0x20), Some(RecordTag::Internal20));
        assert_eq!(RecordTag::from_u8(0x09), None);
    }

    #[test]
    fn test_decode_position() {
        let bytes = encode_record(RecordTag::Position, &position()).unwrap();
        let mut reader = RecordReader::new(&bytes[..]);
        let raw = reader.next().unwrap().unwrap();
        assert_eq!(raw.tag, RecordTag::Position);
        assert_eq!(raw.offset, 0);
        match raw.decode().unwrap() {
            Record::Position(p) => {
                assert_eq!(p, position());
                assert!((p.latitude() + 33.802235).abs() < 1e-9);
                assert!((p.longitude() - 151.283165).abs() < 1e-9);
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(reader.next().is_none());
        assert_eq!(reader.offset(), 45);
    }

    #[test]
    fn test_internal_records_frame_only() {
        let mut bytes = vec![0x07];
        bytes.extend([0xAA; 12]);
        bytes.push(0x20);
        bytes.extend([0x55; 13]);
        let records: Vec<_> = RecordReader::new(&bytes[..])
            .map(|r| r.unwrap().decode().unwrap())
            .collect();
        assert_eq!(
            records,
            vec![
                Record::Internal(RecordTag::Internal07),
                Record::Internal(RecordTag::Internal20)
            ]
        );
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let mut bytes = encode_record(RecordTag::PageTerminator, &PageTerminator { page_length: 7 }).unwrap();
        bytes.extend([0x33, 0x00, 0x00]);
        let mut reader = RecordReader::new(&bytes[..]);
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(TrackError::MalformedRecord { tag, offset })) => {
                assert_eq!(tag, 0x33);
                assert_eq!(offset, 3);
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unknown_tag_with_fallback_is_skipped() {
        let mut bytes = vec![0x33, 1, 2, 3];
        bytes.extend(encode_record(RecordTag::PageTerminator, &PageTerminator { page_length: 9 }).unwrap());
        let mut reader =
            RecordReader::new(&bytes[..]).with_fallback_lengths(HashMap::from([(0x33, 3)]));
        let raw = reader.next().unwrap().unwrap();
        assert_eq!(raw.tag, RecordTag::PageTerminator);
        assert_eq!(raw.offset, 4);
        assert_eq!(
            raw.decode().unwrap(),
            Record::PageTerminator(PageTerminator { page_length: 9 })
        );
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = encode_record(RecordTag::Position, &position()).unwrap();
        let mut reader = RecordReader::new(&bytes[..30]);
        match reader.next() {
            Some(Err(TrackError::TruncatedStream {
                tag,
                expected,
                available,
                ..
            })) => {
                assert_eq!(tag, 0x02);
                assert_eq!(expected, 44);
                assert_eq!(available, 29);
            }
            other => panic!("expected TruncatedStream, got {:?}", other),
        }
    }

    #[test]
    fn test_race_timer_event_codes() {
        let timer = RaceTimerRecord {
            utc_ms: 1,
            code: 4,
            timer_sec: -10,
        };
        assert_eq!(timer.event(), Some(RaceTimerEvent::RaceEnd));
        assert_eq!(RaceTimerEvent::from_u8(9), None);
    }
}
