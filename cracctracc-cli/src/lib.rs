//! Cracctracc command line application
//!
//! Decodes one VKX or GPX track, resolves the true wind for it and writes the
//! classified table and manoeuvre summary as CSV. The wind comes from the
//! first of these that has data:
//!
//! 1. wind records in the track itself (VKX only)
//! 2. the weather-station history, cached per day
//! 3. the fixed `--twd`, with a warning

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use cracctracc_core::{
    decode, AssembledTrack, AssemblerConfig, DecodedTrack, SourceFormat, TrackAssembler,
    TrackError, VkxOptions, WindField,
};

pub mod export;
pub mod wind_api;

use wind_api::{HttpFetcher, WindApiConfig, WindCache, DEFAULT_BASE_URL};

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Sailing manoeuvre analysis for VKX and GPX tracks", long_about = None)]
pub struct Cli {
    /// Track file, .vkx or .gpx
    pub input: PathBuf,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Write the metrics and manoeuvre tables as CSV
    #[arg(long)]
    pub output_csv: bool,

    /// Directory for exported files
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Race start, UNIX milliseconds, overrides the device
    #[arg(long)]
    pub race_start: Option<i64>,

    /// Race end, UNIX milliseconds, overrides the device
    #[arg(long)]
    pub race_end: Option<i64>,

    /// True wind direction used when no wind data is available
    #[arg(long, default_value_t = 0.0)]
    pub twd: f64,

    /// Do not fetch wind data, use the cache only
    #[arg(long)]
    pub offline: bool,

    /// Weather station id
    #[arg(long, default_value_t = wind_api::DEFAULT_STATION)]
    pub wind_station: u32,

    /// Station offset from UTC in seconds
    #[arg(long, default_value_t = wind_api::DEFAULT_UTC_OFFSET_SECS, allow_hyphen_values = true)]
    pub wind_utc_offset: i64,

    /// Wind history endpoint
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub wind_url: String,

    /// Wind cache directory [default: platform cache directory]
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Payload length for an unknown VKX tag, as TAG=LEN (repeatable)
    #[arg(long = "skip-tag", value_name = "TAG=LEN", value_parser = parse_skip_tag)]
    pub skip_tags: Vec<(u8, usize)>,
}

/// Parse `TAG=LEN`, TAG in decimal or 0x-prefixed hex
pub fn parse_skip_tag(s: &str) -> std::result::Result<(u8, usize), String> {
    let (tag, len) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=LEN, got '{}'", s))?;
    let tag = tag.trim();
    let tag = match tag.strip_prefix("0x").or_else(|| tag.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => tag.parse::<u8>(),
    }
    .map_err(|e| format!("bad tag '{}': {}", tag, e))?;
    let len = len
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad length '{}': {}", len, e))?;
    Ok((tag, len))
}

impl Cli {
    pub fn format(&self) -> Result<SourceFormat> {
        self.input
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SourceFormat::from_extension)
            .ok_or_else(|| anyhow!("{}: expected a .vkx or .gpx file", self.input.display()))
    }

    pub fn vkx_options(&self) -> VkxOptions {
        VkxOptions {
            fallback_lengths: self.skip_tags.iter().copied().collect::<HashMap<_, _>>(),
        }
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            race_start: self.race_start,
            race_end: self.race_end,
        }
    }

    pub fn wind_api_config(&self) -> WindApiConfig {
        WindApiConfig {
            base_url: self.wind_url.clone(),
            station: self.wind_station,
            utc_offset_secs: self.wind_utc_offset,
            cache_dir: self.cache_dir.clone().or_else(default_cache_dir),
            offline: self.offline,
        }
    }

    fn stem(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "track".to_string())
    }
}

fn default_cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "cracctracc").map(|dirs| dirs.cache_dir().to_path_buf())
}

fn decode_file(path: &Path, format: SourceFormat, options: &VkxOptions) -> Result<DecodedTrack> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    decode(format, BufReader::new(file), options)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn resolve_wind(cli: &Cli, track: &DecodedTrack) -> Result<WindField> {
    if !track.wind.is_empty() {
        log::info!("Using {} wind records from the track", track.wind.len());
        return Ok(WindField::from_samples(track.wind.clone())?);
    }

    let (start, end) = match track.time_span() {
        Some(span) => span,
        None => return Ok(WindField::fixed(cli.twd)),
    };

    let config = cli.wind_api_config();
    let station = if config.offline && config.cache_dir.is_none() {
        Err(TrackError::MissingWindData("offline and no wind cache".to_string()))
    } else {
        match WindCache::new(config, HttpFetcher::new()?).wind_for_span(start, end) {
            Ok(field) => Ok(field),
            Err(e) => match e.downcast::<TrackError>() {
                Ok(track_error) => Err(track_error),
                Err(other) => return Err(other),
            },
        }
    };
    Ok(WindField::or_fixed(station, cli.twd)?)
}

/// Decode, classify and optionally export one track
pub fn run(cli: &Cli) -> Result<AssembledTrack> {
    let format = cli.format()?;
    let mut assembler = TrackAssembler::new(cli.assembler_config())?;

    let decoded = decode_file(&cli.input, format, &cli.vkx_options())?;
    if decoded.samples.is_empty() {
        bail!("{}: no track samples", cli.input.display());
    }
    log::info!(
        "{}: {} samples from {:?}",
        cli.input.display(),
        decoded.samples.len(),
        format
    );

    let wind = resolve_wind(cli, &decoded)?;
    let track = assembler.assemble(decoded, &wind)?;

    for event in &track.manoeuvres {
        log::info!(
            "{:?} at {} ({:.1} -> {:.1} deg TWA, {:.1} kn)",
            event.kind,
            event.utc_ms,
            event.twa_before,
            event.twa_after,
            event.sog
        );
    }

    if cli.output_csv {
        export::write_track(&track, &cli.output_dir, &cli.stem())?;
    }
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skip_tag() {
        assert_eq!(parse_skip_tag("0x42=3"), Ok((0x42, 3)));
        assert_eq!(parse_skip_tag("66=16"), Ok((66, 16)));
        assert!(parse_skip_tag("0x42").is_err());
        assert!(parse_skip_tag("0x142=3").is_err());
        assert!(parse_skip_tag("2=-1").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["cracctracc", "race.vkx"]);
        assert_eq!(cli.format().unwrap(), SourceFormat::Vkx);
        assert_eq!(cli.output_dir, PathBuf::from("output"));
        assert_eq!(cli.twd, 0.0);
        assert!(!cli.output_csv);
        let wind = cli.wind_api_config();
        assert_eq!(wind.station, 733);
        assert_eq!(wind.utc_offset_secs, 39600);
        assert_eq!(wind.base_url, DEFAULT_BASE_URL);
        assert!(cli.vkx_options().fallback_lengths.is_empty());
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::parse_from([
            "cracctracc",
            "sail.GPX",
            "--race-start",
            "1635557400000",
            "--twd",
            "225",
            "--skip-tag",
            "0x42=3",
            "--skip-tag",
            "0x43=8",
            "--wind-utc-offset",
            "-18000",
            "-vv",
        ]);
        assert_eq!(cli.format().unwrap(), SourceFormat::Gpx);
        assert_eq!(cli.assembler_config().race_start, Some(1_635_557_400_000));
        assert_eq!(cli.twd, 225.0);
        assert_eq!(cli.wind_utc_offset, -18000);
        let options = cli.vkx_options();
        assert_eq!(options.fallback_lengths.get(&0x42), Some(&3));
        assert_eq!(options.fallback_lengths.get(&0x43), Some(&8));
    }

    #[test]
    fn test_unknown_extension() {
        let cli = Cli::parse_from(["cracctracc", "track.fit"]);
        assert!(cli.format().is_err());
    }
}
