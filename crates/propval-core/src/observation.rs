//! Observed signal reports and the store boundary they arrive through.
//!
//! Acquisition (HTTP queries, timezone conversion) happens elsewhere. What
//! reaches this crate is one JSON array per band, already in UTC and time
//! ordered:
//!
//! ```json
//! [{"time": "2025-01-03 14:02:00", "band": 14, "frequency": 14097050, "snr": -17, "power": 37}]
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::HOURS;

/// Timestamp layout used by the acquisition tool.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One received report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSample {
    pub timestamp: DateTime<Utc>,
    /// Signal-to-noise ratio in dB.
    pub snr: i32,
}

impl ObservationSample {
    pub fn new(timestamp: DateTime<Utc>, snr: i32) -> Self {
        Self { timestamp, snr }
    }

    /// Hour-of-day slot 0–23.
    pub fn hour(&self) -> usize {
        self.timestamp.hour() as usize
    }
}

/// Row shape written by the acquisition tool. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct SampleRow {
    time: String,
    snr: i32,
}

/// Parse the acquisition tool's JSON array. Rows with an unreadable
/// timestamp are skipped.
pub fn parse_samples(json: &str, origin: &Path) -> Result<Vec<ObservationSample>> {
    let rows: Vec<SampleRow> = serde_json::from_str(json).map_err(|e| Error::json(origin, e))?;
    let total = rows.len();
    let samples: Vec<ObservationSample> = rows
        .into_iter()
        .filter_map(|row| match NaiveDateTime::parse_from_str(&row.time, TIME_FORMAT) {
            Ok(t) => Some(ObservationSample::new(t.and_utc(), row.snr)),
            Err(e) => {
                debug!("bad timestamp '{}' in {}: {e}", row.time, origin.display());
                None
            }
        })
        .collect();
    if samples.len() < total {
        warn!(
            "{}: skipped {} of {} rows with unreadable timestamps",
            origin.display(),
            total - samples.len(),
            total
        );
    }
    Ok(samples)
}

/// Load one band's sample file.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<ObservationSample>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_samples(&json, path)
}

// ---------------------------------------------------------------------------
// Hourly partition
// ---------------------------------------------------------------------------

/// Samples split into 24 hour-of-day buckets, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySamples {
    hours: [Vec<f64>; HOURS],
}

impl HourlySamples {
    pub fn partition(samples: &[ObservationSample]) -> Self {
        let mut hours: [Vec<f64>; HOURS] = Default::default();
        for s in samples {
            hours[s.hour()].push(f64::from(s.snr));
        }
        for bucket in &mut hours {
            bucket.sort_by(|a, b| a.total_cmp(b));
        }
        Self { hours }
    }

    /// Build directly from per-hour SNR lists (hour index = position).
    pub fn from_hours(raw: Vec<Vec<i32>>) -> Self {
        let mut hours: [Vec<f64>; HOURS] = Default::default();
        for (slot, values) in hours.iter_mut().zip(raw) {
            *slot = values.into_iter().map(f64::from).collect();
            slot.sort_by(|a, b| a.total_cmp(b));
        }
        Self { hours }
    }

    /// Sorted samples for `hour`; empty for out-of-range hours.
    pub fn hour(&self, hour: usize) -> &[f64] {
        self.hours.get(hour).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn counts(&self) -> [usize; HOURS] {
        let mut out = [0; HOURS];
        for (slot, bucket) in out.iter_mut().zip(&self.hours) {
            *slot = bucket.len();
        }
        out
    }

    pub fn total(&self) -> usize {
        self.hours.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Supplies observed samples for one circuit and month, per band.
pub trait ObservationStore {
    /// All samples for `band`. A band with no data is an empty vector.
    fn samples(&self, band: u32) -> Result<Vec<ObservationSample>>;
}

/// Store backed by a directory of `<band>.json` files.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<band>.json`, falling back to the zero-padded `<band:02>.json`.
    pub fn band_path(&self, band: u32) -> PathBuf {
        let plain = self.dir.join(format!("{band}.json"));
        if plain.exists() {
            return plain;
        }
        self.dir.join(format!("{band:02}.json"))
    }
}

impl ObservationStore for DirectoryStore {
    fn samples(&self, band: u32) -> Result<Vec<ObservationSample>> {
        let path = self.band_path(band);
        match fs::read_to_string(&path) {
            Ok(json) => parse_samples(&json, &path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no sample file for band {band} in {}", self.dir.display());
                Ok(Vec::new())
            }
            Err(e) => Err(Error::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"[
        {"time": "2025-01-01 00:04:00", "band": 14, "frequency": 14097060, "snr": -21, "power": 37},
        {"time": "2025-01-01 00:36:00", "band": 14, "frequency": 14097061, "snr": -9, "power": 37},
        {"time": "2025-01-01 13:10:00", "band": 14, "frequency": 14097059, "snr": -14, "power": 37},
        {"time": "garbage", "band": 14, "frequency": 14097059, "snr": 0, "power": 37}
    ]"#;

    #[test]
    fn test_parses_rows_and_skips_bad_timestamps() {
        let samples = parse_samples(ROWS, Path::new("14.json")).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].snr, -21);
        assert_eq!(samples[2].hour(), 13);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = parse_samples("{not json", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn test_partition_sorts_each_hour() {
        let samples = parse_samples(ROWS, Path::new("14.json")).unwrap();
        let hourly = HourlySamples::partition(&samples);
        assert_eq!(hourly.hour(0), &[-21.0, -9.0]);
        assert_eq!(hourly.hour(13), &[-14.0]);
        assert!(hourly.hour(5).is_empty());
        assert!(hourly.hour(99).is_empty());
        assert_eq!(hourly.total(), 3);
        assert_eq!(hourly.counts()[0], 2);
    }

    #[test]
    fn test_hour_is_taken_from_stored_timestamp() {
        // Late-evening rows land in the stored hour, not shifted by any local offset.
        let rows = r#"[
            {"time": "2025-06-30 23:59:00", "snr": -7},
            {"time": "2025-07-01 00:00:00", "snr": -3}
        ]"#;
        let samples = parse_samples(rows, Path::new("07.json")).unwrap();
        assert_eq!(samples[0].hour(), 23);
        assert_eq!(samples[1].hour(), 0);
        let hourly = HourlySamples::partition(&samples);
        assert_eq!(hourly.hour(23), &[-7.0]);
        assert_eq!(hourly.hour(0), &[-3.0]);
    }

    #[test]
    fn test_from_hours_places_by_index() {
        let hourly = HourlySamples::from_hours(vec![vec![3, 1, 2], vec![], vec![-5]]);
        assert_eq!(hourly.hour(0), &[1.0, 2.0, 3.0]);
        assert_eq!(hourly.hour(2), &[-5.0]);
        assert!(!hourly.is_empty());
        assert!(HourlySamples::default().is_empty());
    }

    #[test]
    fn test_directory_store_reads_padded_names_and_tolerates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("07.json"), ROWS).unwrap();
        let store = DirectoryStore::new(tmp.path());
        assert_eq!(store.samples(7).unwrap().len(), 3);
        assert!(store.samples(21).unwrap().is_empty());
    }
}
