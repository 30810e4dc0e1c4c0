//! Per-circuit persisted comparison document.
//!
//! One JSON object per circuit (and month), keyed by band:
//!
//! ```json
//! {
//!   "14": {
//!     "REQ_SNR": {"mu": -27.1, "sigma": 1.9, "n": 21},
//!     "REL": {"WSPR": {"avg": 0.71, "rel": [...]}, "VOACAP": {...}, "DIFF": {...}},
//!     "SCORE": {"cohen's d": [...], "lvr_up": [...], "lvr_lw": [...]},
//!     "SAMPLES": [...],
//!     "HOURS": [...]
//!   }
//! }
//! ```
//!
//! Undefined numbers are written as `null` and read back as `NaN`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::comparison::{ComparisonRecord, ComparisonSummary};
use crate::distribution::RequiredSnr;
use crate::error::{Error, Result};
use crate::score::{BucketCount, ScoreHistogram, SignedHistogram};
use crate::stats::{f64_or_nan, nan_mean, vec_f64_or_nan};

/// Hourly reliability series with its NaN-skipping mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilitySeries {
    #[serde(deserialize_with = "f64_or_nan")]
    pub avg: f64,
    #[serde(deserialize_with = "vec_f64_or_nan")]
    pub rel: Vec<f64>,
}

impl ReliabilitySeries {
    pub fn new(rel: Vec<f64>) -> Self {
        Self {
            avg: nan_mean(&rel),
            rel,
        }
    }
}

/// Observed (WSPR), predicted (VOACAP) and observed − predicted reliability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilitySection {
    #[serde(rename = "WSPR")]
    pub observed: ReliabilitySeries,
    #[serde(rename = "VOACAP")]
    pub predicted: ReliabilitySeries,
    #[serde(rename = "DIFF")]
    pub difference: ReliabilitySeries,
}

impl ReliabilitySection {
    pub fn from_records(records: &[ComparisonRecord]) -> Self {
        let observed: Vec<f64> = records.iter().map(|r| r.reliability_observed).collect();
        let predicted: Vec<f64> = records.iter().map(|r| r.reliability_predicted).collect();
        let difference = observed.iter().zip(&predicted).map(|(o, p)| o - p).collect();
        Self {
            observed: ReliabilitySeries::new(observed),
            predicted: ReliabilitySeries::new(predicted),
            difference: ReliabilitySeries::new(difference),
        }
    }
}

/// Score histograms as ordinal-ordered rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSection {
    #[serde(rename = "cohen's d")]
    pub cohens_d: Vec<BucketCount>,
    pub lvr_up: Vec<BucketCount>,
    pub lvr_lw: Vec<BucketCount>,
}

impl ScoreSection {
    pub fn from_histogram(hist: &ScoreHistogram) -> Self {
        Self {
            cohens_d: hist.cohens_d.to_rows(),
            lvr_up: hist.lvr_upper.to_rows(),
            lvr_lw: hist.lvr_lower.to_rows(),
        }
    }

    pub fn to_histogram(&self) -> ScoreHistogram {
        ScoreHistogram {
            cohens_d: SignedHistogram::from_rows(&self.cohens_d),
            lvr_upper: SignedHistogram::from_rows(&self.lvr_up),
            lvr_lower: SignedHistogram::from_rows(&self.lvr_lw),
        }
    }
}

/// Everything persisted for one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEntry {
    #[serde(rename = "REQ_SNR")]
    pub required_snr: RequiredSnr,
    #[serde(rename = "REL")]
    pub reliability: ReliabilitySection,
    #[serde(rename = "SCORE")]
    pub score: ScoreSection,
    #[serde(rename = "SAMPLES", default)]
    pub sample_counts: Vec<usize>,
    #[serde(rename = "HOURS", default)]
    pub hours: Vec<ComparisonRecord>,
}

impl BandEntry {
    pub fn new(
        required_snr: RequiredSnr,
        records: Vec<ComparisonRecord>,
        sample_counts: &[usize],
        histogram: &ScoreHistogram,
    ) -> Self {
        Self {
            required_snr,
            reliability: ReliabilitySection::from_records(&records),
            score: ScoreSection::from_histogram(histogram),
            sample_counts: sample_counts.to_vec(),
            hours: records,
        }
    }

    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary::from_records(&self.hours)
    }

    pub fn total_samples(&self) -> usize {
        self.sample_counts.iter().sum()
    }
}

/// Band-keyed comparison document of one circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitAggregate {
    bands: BTreeMap<u32, BandEntry>,
}

impl CircuitAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted document. A missing file is an empty aggregate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).map_err(|e| Error::json(path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no aggregate at {}, starting empty", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Write the document through a temporary file in the same directory,
    /// renamed over `path` once complete.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let json = serde_json::to_string_pretty(self).map_err(|e| Error::json(path, e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::io(&tmp_path, e))?;
        tmp.flush().map_err(|e| Error::io(&tmp_path, e))?;
        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
        Ok(())
    }

    /// Insert or replace the entry of `band`.
    pub fn merge(&mut self, band: u32, entry: BandEntry) -> Option<BandEntry> {
        self.bands.insert(band, entry)
    }

    pub fn get(&self, band: u32) -> Option<&BandEntry> {
        self.bands.get(&band)
    }

    pub fn bands(&self) -> impl Iterator<Item = (u32, &BandEntry)> {
        self.bands.iter().map(|(b, e)| (*b, e))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Circuit-wide histogram, summed over the stored bands.
    pub fn score_total(&self) -> ScoreHistogram {
        let mut total = ScoreHistogram::default();
        for entry in self.bands.values() {
            total.merge(&entry.score.to_histogram());
        }
        total
    }
}
