//! Ordinal severity buckets for effect sizes.
//!
//! Location (Cohen's d) and spread (log-variance ratio) use separate fixed
//! calibrations. Positive and negative values are counted apart so that a
//! one-directional model bias stays visible.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::comparison::ComparisonRecord;

/// Upper bounds (exclusive, on |value|) of the location buckets.
pub const LOCATION_THRESHOLDS: [f64; 7] = [2.0, 4.0, 6.0, 8.0, 10.0, 14.0, f64::INFINITY];

/// Upper bounds (exclusive, on |value|) of the spread buckets.
pub const SPREAD_THRESHOLDS: [f64; 7] = [0.4, 0.8, 1.2, 1.6, 2.0, 2.2, f64::INFINITY];

/// Seven ordinal severity labels, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreBucket {
    VerySmall,
    Small,
    Medium,
    Large,
    VeryLarge,
    Huge,
    Crazy,
}

impl ScoreBucket {
    pub const ALL: [ScoreBucket; 7] = [
        ScoreBucket::VerySmall,
        ScoreBucket::Small,
        ScoreBucket::Medium,
        ScoreBucket::Large,
        ScoreBucket::VeryLarge,
        ScoreBucket::Huge,
        ScoreBucket::Crazy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScoreBucket::VerySmall => "Very Small",
            ScoreBucket::Small => "Small",
            ScoreBucket::Medium => "Medium",
            ScoreBucket::Large => "Large",
            ScoreBucket::VeryLarge => "Very Large",
            ScoreBucket::Huge => "Huge",
            ScoreBucket::Crazy => "Crazy",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bucket of `value` under `thresholds`; `None` for `NaN`.
    pub fn classify(value: f64, thresholds: &[f64; 7]) -> Option<ScoreBucket> {
        if value.is_nan() {
            return None;
        }
        let magnitude = value.abs();
        thresholds
            .iter()
            .position(|&upper| magnitude < upper)
            .map(|i| ScoreBucket::ALL[i])
    }
}

impl fmt::Display for ScoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-bucket counts split by sign. Zero counts as positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignedHistogram {
    pub positive: [u32; 7],
    pub negative: [u32; 7],
}

/// One persisted histogram row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub label: String,
    pub positive: u32,
    pub negative: u32,
}

impl SignedHistogram {
    pub fn from_values(values: &[f64], thresholds: &[f64; 7]) -> Self {
        let mut hist = Self::default();
        hist.add_values(values, thresholds);
        hist
    }

    pub fn add_values(&mut self, values: &[f64], thresholds: &[f64; 7]) {
        for &v in values {
            let Some(bucket) = ScoreBucket::classify(v, thresholds) else {
                continue;
            };
            if v < 0.0 {
                self.negative[bucket.index()] += 1;
            } else {
                self.positive[bucket.index()] += 1;
            }
        }
    }

    pub fn merge(&mut self, other: &SignedHistogram) {
        for i in 0..7 {
            self.positive[i] += other.positive[i];
            self.negative[i] += other.negative[i];
        }
    }

    pub fn total(&self) -> u32 {
        self.positive.iter().sum::<u32>() + self.negative.iter().sum::<u32>()
    }

    pub fn count(&self, bucket: ScoreBucket) -> u32 {
        self.positive[bucket.index()] + self.negative[bucket.index()]
    }

    /// Rows in ordinal order, smallest bucket first.
    pub fn to_rows(&self) -> Vec<BucketCount> {
        ScoreBucket::ALL
            .iter()
            .map(|b| BucketCount {
                label: b.label().to_string(),
                positive: self.positive[b.index()],
                negative: self.negative[b.index()],
            })
            .collect()
    }

    /// Inverse of [`to_rows`](Self::to_rows). Rows are matched by label,
    /// so their stored order does not matter; unknown labels are ignored.
    pub fn from_rows(rows: &[BucketCount]) -> Self {
        let mut hist = Self::default();
        for row in rows {
            if let Some(b) = ScoreBucket::ALL.iter().find(|b| b.label() == row.label) {
                hist.positive[b.index()] += row.positive;
                hist.negative[b.index()] += row.negative;
            }
        }
        hist
    }
}

/// Histograms of the three effect-size metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreHistogram {
    pub cohens_d: SignedHistogram,
    pub lvr_upper: SignedHistogram,
    pub lvr_lower: SignedHistogram,
}

impl ScoreHistogram {
    pub fn merge(&mut self, other: &ScoreHistogram) {
        self.cohens_d.merge(&other.cohens_d);
        self.lvr_upper.merge(&other.lvr_upper);
        self.lvr_lower.merge(&other.lvr_lower);
    }
}

/// Classify three metric series into a fresh histogram.
pub fn classify(cohens_d: &[f64], lvr_upper: &[f64], lvr_lower: &[f64]) -> ScoreHistogram {
    ScoreHistogram {
        cohens_d: SignedHistogram::from_values(cohens_d, &LOCATION_THRESHOLDS),
        lvr_upper: SignedHistogram::from_values(lvr_upper, &SPREAD_THRESHOLDS),
        lvr_lower: SignedHistogram::from_values(lvr_lower, &SPREAD_THRESHOLDS),
    }
}

/// Classify the effect sizes of a band's comparison records.
pub fn classify_records(records: &[ComparisonRecord]) -> ScoreHistogram {
    let cohens: Vec<f64> = records.iter().map(|r| r.cohens_d).collect();
    let up: Vec<f64> = records.iter().map(|r| r.log_variance_ratio_upper).collect();
    let lw: Vec<f64> = records.iter().map(|r| r.log_variance_ratio_lower).collect();
    classify(&cohens, &up, &lw)
}

/// Per-circuit accumulator. Owned by one circuit session, never shared.
///
/// Keeps each band's histogram so that classifying a band again replaces
/// its counts instead of adding to them.
#[derive(Debug, Clone, Default)]
pub struct ScoreClassifier {
    bands: BTreeMap<u32, ScoreHistogram>,
}

impl ScoreClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one band's records, record them under `band` and return
    /// the band's own histogram.
    pub fn add_band(&mut self, band: u32, records: &[ComparisonRecord]) -> ScoreHistogram {
        let hist = classify_records(records);
        self.bands.insert(band, hist);
        hist
    }

    /// Forget a band, e.g. one whose results could not be persisted.
    pub fn remove_band(&mut self, band: u32) -> Option<ScoreHistogram> {
        self.bands.remove(&band)
    }

    pub fn band(&self, band: u32) -> Option<&ScoreHistogram> {
        self.bands.get(&band)
    }

    /// Histogram summed over every band classified so far.
    pub fn total(&self) -> ScoreHistogram {
        let mut total = ScoreHistogram::default();
        for hist in self.bands.values() {
            total.merge(hist);
        }
        total
    }

    pub fn bands(&self) -> usize {
        self.bands.len()
    }
}
