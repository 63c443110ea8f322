//! Wire formats
//!
//! Pure framing and payload decoding, no interpretation of what the records
//! mean for a track.

pub mod vkx;

pub use vkx::{RawRecord, Record, RecordReader, RecordTag, RECORD_TABLE};
