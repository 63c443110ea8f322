//! Weather-station wind history over HTTP with a date-keyed file cache
//!
//! One document per station and local calendar date. The cache is
//! read-through: a cached body is always used as is, a miss is fetched and
//! written back. Nothing is ever expired.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use cracctracc_core::wind::station::{filter_wind_data, parse_station_response, DEFAULT_PADDING_MS};
use cracctracc_core::{EpochMillis, TrackError, WindField, WindSample};

pub const DEFAULT_BASE_URL: &str =
    "https://www.willyweather.com.au/climate/weather-stations/graphs.json";
pub const DEFAULT_STATION: u32 = 733;
/// AEDT
pub const DEFAULT_UTC_OFFSET_SECS: i64 = 39600;

// A track longer than this is not a single race
const MAX_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindApiConfig {
    pub base_url: String,
    pub station: u32,
    /// Station offset from UTC, seconds
    pub utc_offset_secs: i64,
    /// No caching when unset
    pub cache_dir: Option<PathBuf>,
    /// Cache only, never touch the network
    pub offline: bool,
}

impl Default for WindApiConfig {
    fn default() -> Self {
        WindApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            station: DEFAULT_STATION,
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
            cache_dir: None,
            offline: false,
        }
    }
}

/// Something that can GET a URL and return the body
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("cracctracc/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("GET {}", url))?;
        Ok(response.text()?)
    }
}

/// Query for one station and one day, hourly wind speed and direction
pub fn station_url(config: &WindApiConfig, date: NaiveDate) -> String {
    format!(
        "{}?graph=station:{},startDate:{date},endDate:{date},grain:hourly,\
         series=order:4,id:wind-speed,type:climate,\
         series=order:5,id:wind-direction,type:climate",
        config.base_url,
        config.station,
        date = date.format("%Y-%m-%d")
    )
}

pub fn cache_path(dir: &Path, station: u32, date: NaiveDate) -> PathBuf {
    dir.join(format!("wind-{}-{}.json", station, date.format("%Y-%m-%d")))
}

/// Station-local calendar date of a UTC instant
pub fn local_date(utc_ms: EpochMillis, utc_offset_secs: i64) -> Option<NaiveDate> {
    let local_ms = utc_offset_secs
        .checked_mul(1000)
        .and_then(|offset_ms| utc_ms.checked_add(offset_ms))?;
    DateTime::from_timestamp_millis(local_ms).map(|dt| dt.date_naive())
}

pub struct WindCache<F> {
    config: WindApiConfig,
    fetcher: F,
}

impl<F: Fetch> WindCache<F> {
    pub fn new(config: WindApiConfig, fetcher: F) -> Self {
        WindCache { config, fetcher }
    }

    /// Raw response for one day, `None` if neither cache nor network has it
    pub fn body_for(&self, date: NaiveDate) -> Result<Option<String>> {
        let cached = self
            .config
            .cache_dir
            .as_ref()
            .map(|dir| cache_path(dir, self.config.station, date));

        if let Some(path) = cached.as_ref().filter(|p| p.is_file()) {
            log::debug!("Wind cache hit {}", path.display());
            let body = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return Ok(Some(body));
        }

        if self.config.offline {
            log::debug!("Offline, no cached wind for {}", date);
            return Ok(None);
        }

        let url = station_url(&self.config, date);
        log::info!("Fetching wind for station {} on {}", self.config.station, date);
        let body = match self.fetcher.fetch(&url) {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Wind fetch failed: {:#}", e);
                return Ok(None);
            }
        };

        if let Some(path) = cached {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, &body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::debug!("Wind cached to {}", path.display());
        }
        Ok(Some(body))
    }

    /// Station wind covering `[start, end]` plus padding
    ///
    /// Days with no data are skipped; if nothing at all is found the result
    /// is `MissingWindData` so the caller can fall back to a fixed TWD.
    pub fn wind_for_span(&self, start_ms: EpochMillis, end_ms: EpochMillis) -> Result<WindField> {
        let offset = self.config.utc_offset_secs;
        let (first, last) = match (
            start_ms
                .checked_sub(DEFAULT_PADDING_MS)
                .and_then(|ms| local_date(ms, offset)),
            end_ms
                .checked_add(DEFAULT_PADDING_MS)
                .and_then(|ms| local_date(ms, offset)),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(TrackError::MissingWindData(format!(
                    "track time {}..{} out of calendar range",
                    start_ms, end_ms
                ))
                .into())
            }
        };

        let mut samples: Vec<WindSample> = Vec::new();
        let mut date = first;
        for _ in 0..MAX_DAYS {
            if date > last {
                break;
            }
            if let Some(body) = self.body_for(date)? {
                let day = parse_station_response(&body, offset)
                    .with_context(|| format!("Station {} on {}", self.config.station, date))?;
                samples.extend(day);
            }
            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        if date <= last {
            log::warn!(
                "Track spans more than {} station days, no wind fetched from {} to {}",
                MAX_DAYS,
                date,
                last
            );
        }

        let kept = filter_wind_data(&samples, start_ms, end_ms, DEFAULT_PADDING_MS);
        log::debug!("Station wind: {} observations, {} in span", samples.len(), kept.len());
        Ok(WindField::from_samples(kept)?)
    }
}
