//! Cracctracc Core
//!
//! Platform-independent decoding and classification of sailing tracks.
//! This crate performs no network or file system access of its own; decoders
//! take any `std::io::Read` and everything else works on in-memory values.
//!
//! # Pipeline
//!
//! - **protocol**: VKX record framing and fixed-layout payloads
//! - **track**: the binary and GPX front ends producing [`Sample`]s
//! - **kinematics**: geodesic speed/course and quaternion attitude
//! - **wind**: true wind angle, tack and wind interpolation
//! - **manoeuvres**: point of sail and tack/gybe/round-up/bear-away detection
//! - **assembler**: trims, rounds and classifies a decoded track
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::fs::File;
//! use cracctracc_core::{decode, AssemblerConfig, SourceFormat, TrackAssembler, VkxOptions, WindField};
//!
//! let file = File::open("race.vkx")?;
//! let decoded = decode(SourceFormat::Vkx, file, &VkxOptions::default())?;
//! let wind = WindField::or_fixed(WindField::from_samples(decoded.wind.clone()), 0.0)?;
//!
//! let mut assembler = TrackAssembler::new(AssemblerConfig::default())?;
//! let track = assembler.assemble(decoded, &wind)?;
//! ```

pub mod assembler;
pub mod error;
pub mod kinematics;
pub mod manoeuvres;
pub mod protocol;
pub mod track;
pub mod wind;

pub use assembler::{
    validate_epoch_millis, AssembledTrack, AssemblerConfig, SequenceGenerator, TrackAssembler,
    TrackId,
};
pub use error::{Result, TrackError};
pub use manoeuvres::{Manoeuvre, ManoeuvreDetector, ManoeuvreEvent, PointOfSail};
pub use track::vkx::VkxOptions;
pub use track::{
    decode, ClassifiedSample, DecodedTrack, EpochMillis, RaceWindow, Sample, SourceFormat,
    WindSample,
};
pub use wind::{Tack, WindAngle, WindField};
