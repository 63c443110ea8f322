//! Track processing errors
//!
//! Every failure in the decode / derive / classify pipeline is reported as a
//! [`TrackError`]. Nothing in this crate retries or resynchronises on its own;
//! the caller decides what to do with a failed track.

use thiserror::Error;

/// Result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, TrackError>;

#[derive(Error, Debug)]
pub enum TrackError {
    /// Record tag with no known payload length; continuing would desynchronise the stream
    #[error("Unknown record tag 0x{tag:02x} at offset {offset}, cannot determine payload length")]
    MalformedRecord { tag: u8, offset: u64 },

    /// End of stream inside a record payload
    #[error("Record 0x{tag:02x} at offset {offset} truncated: expected {expected} bytes, got {available}")]
    TruncatedStream {
        tag: u8,
        offset: u64,
        expected: usize,
        available: usize,
    },

    #[error("Track point {index} has no parseable time")]
    MissingTimestamp { index: usize },

    #[error("Timestamp {current} at sample {index} does not follow {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: i64,
        current: i64,
    },

    /// Device time too large for a signed millisecond epoch
    #[error("Record 0x{tag:02x} at offset {offset} has out of range time {value}")]
    TimestampOutOfRange { tag: u8, offset: u64, value: u64 },

    #[error("Track point {index} has an invalid coordinate: {reason}")]
    InvalidCoordinate { index: usize, reason: String },

    /// Race start/end is not a 13 digit UNIX millisecond value
    #[error("Race window bound {value} is not a 13 digit UNIX millisecond timestamp")]
    InvalidRaceWindow { value: i64 },

    #[error("No wind data available: {0}")]
    MissingWindData(String),

    #[error("Wind data format: {0}")]
    WindFormat(String),

    #[error("XML: {0}")]
    Xml(String),

    #[error("Payload decode: {0}")]
    Decode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for TrackError {
    fn from(e: quick_xml::Error) -> Self {
        TrackError::Xml(e.to_string())
    }
}
